#[cfg(test)]
#[path = "signer_test.rs"]
mod tests;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use hmac::Hmac;
use hmac::Mac;
use sha1::Sha1;
use uuid::Uuid;

use crate::domain::models::UploadAuth;

type HmacSha1 = Hmac<Sha1>;

/// Seconds an issued signature stays valid.
pub const DEFAULT_EXPIRY_SECS: i64 = 60 * 30;

/// Issues the token/expire/signature triple ImageKit checks on client-side
/// uploads. Only the server holds the private key.
#[derive(Clone)]
pub struct ImageKitSigner {
    private_key: String,
    expiry_secs: i64,
}

impl ImageKitSigner {
    pub fn new(private_key: &str) -> Result<ImageKitSigner> {
        if private_key.is_empty() {
            bail!("ImageKit private key is not defined");
        }

        return Ok(ImageKitSigner {
            private_key: private_key.to_string(),
            expiry_secs: DEFAULT_EXPIRY_SECS,
        });
    }

    pub fn authentication_parameters(&self) -> Result<UploadAuth> {
        let token = Uuid::new_v4().to_string();
        let expire = chrono::Utc::now().timestamp() + self.expiry_secs;
        return self.sign(&token, expire);
    }

    pub fn sign(&self, token: &str, expire: i64) -> Result<UploadAuth> {
        let mut mac = HmacSha1::new_from_slice(self.private_key.as_bytes())
            .map_err(|err| return anyhow!("Invalid ImageKit private key: {err}"))?;
        mac.update(format!("{token}{expire}").as_bytes());

        return Ok(UploadAuth {
            token: token.to_string(),
            expire,
            signature: hex::encode(mac.finalize().into_bytes()),
        });
    }
}
