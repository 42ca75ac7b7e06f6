use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;
use rand::Rng;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

#[cfg(not(test))]
const ITERATIONS: u32 = 260_000;
// Les tests hashent beaucoup de mots de passe
#[cfg(test)]
const ITERATIONS: u32 = 1_000;

const KEY_LENGTH: usize = 32;

/// Hash un mot de passe avec PBKDF2-HMAC-SHA256 et un salt de 16 bytes
/// Format: pbkdf2:sha256:iterations$salt$hash (base64 URL-safe sans padding)
pub fn hash_password(password: &str) -> Result<String, AppError> {
    // Générer un salt aléatoire de 16 bytes
    let mut salt = [0u8; 16];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, ITERATIONS, &mut key)
        .map_err(|e| AppError::Internal(format!("PBKDF2 hash generation failed: {}", e)))?;

    let salt_b64 = URL_SAFE_NO_PAD.encode(salt);
    let hash_b64 = URL_SAFE_NO_PAD.encode(key);

    Ok(format!("pbkdf2:sha256:{}${}${}", ITERATIONS, salt_b64, hash_b64))
}

/// Vérifie un mot de passe contre un hash stocké
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let invalid = |what: &str| AppError::Internal(format!("Invalid password hash: {}", what));

    // Parser le format: pbkdf2:sha256:iterations$salt$hash
    let parts: Vec<&str> = stored_hash.split('$').collect();
    if parts.len() != 3 {
        return Err(invalid("format"));
    }

    let header_parts: Vec<&str> = parts[0].split(':').collect();
    if header_parts.len() != 3 || header_parts[0] != "pbkdf2" || header_parts[1] != "sha256" {
        return Err(invalid("header"));
    }

    let iterations = header_parts[2]
        .parse::<u32>()
        .map_err(|_| invalid("iterations"))?;

    let salt = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|_| invalid("salt"))?;
    let expected_hash = URL_SAFE_NO_PAD.decode(parts[2]).map_err(|_| invalid("hash"))?;

    let mut computed = vec![0u8; expected_hash.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut computed)
        .map_err(|e| AppError::Internal(format!("PBKDF2 hash verification failed: {}", e)))?;

    // Comparaison en temps constant
    let diff = computed
        .iter()
        .zip(expected_hash.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    Ok(diff == 0)
}
