use log::*;
use payflow_common::Secret;
use sha2::{Digest, Sha512};

use crate::data_objects::GatewayNotification;

/// The gateway signs each notification with SHA-512 over `order_id + status_code + gross_amount + server_key`,
/// hex encoded.
pub fn calculate_gateway_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// Checks a gateway notification signature. When checks are disabled every notification passes.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    server_key: Secret<String>,
    enabled: bool,
}

impl SignatureVerifier {
    pub fn new(server_key: Secret<String>, enabled: bool) -> Self {
        Self { server_key, enabled }
    }

    pub fn disabled() -> Self {
        Self { server_key: Secret::default(), enabled: false }
    }

    pub fn verify(&self, notification: &GatewayNotification) -> bool {
        if !self.enabled {
            trace!("🔐️ Signature checks are disabled. Allowing notification.");
            return true;
        }
        let (Some(status_code), Some(gross_amount), Some(signature)) =
            (&notification.status_code, &notification.gross_amount, &notification.signature_key)
        else {
            warn!("🔐️ Gateway notification for {} is not signed. Denying it.", notification.order_id);
            return false;
        };
        let expected =
            calculate_gateway_signature(&notification.order_id, status_code, gross_amount, self.server_key.reveal());
        let valid = expected.eq_ignore_ascii_case(signature);
        if valid {
            trace!("🔐️ Signature check for {} ✅️", notification.order_id);
        } else {
            warn!("🔐️ Invalid signature on gateway notification for {}. Denying it.", notification.order_id);
        }
        valid
    }
}
