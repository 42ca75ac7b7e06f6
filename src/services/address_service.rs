// ============================================================================
// SERVICE : ADRESSES
// ============================================================================
//
// Règle principale: au plus UNE adresse par défaut par utilisateur.
//   - création avec is_default -> les autres sont désactivées d'abord
//   - première adresse (aucune par défaut) -> devient l'adresse par défaut
//   - suppression de l'adresse par défaut -> la plus récente restante la remplace
//
// Toutes les opérations sur une adresse vérifient qu'elle appartient à l'appelant.
//
// ============================================================================

use std::sync::Arc;

use validator::Validate;

use crate::errors::{AppError, AppResult, DbContext};
use crate::models::addresses;
use crate::models::dto::AddressRequest;
use crate::repositories::{AddressRepository, NewAddress};

pub const DEFAULT_COUNTRY: &str = "Thailand";

pub struct AddressService {
    addresses: Arc<dyn AddressRepository>,
}

impl AddressService {
    pub fn new(addresses: Arc<dyn AddressRepository>) -> Self {
        Self { addresses }
    }

    pub async fn create(&self, user_id: i32, req: AddressRequest) -> AppResult<addresses::Model> {
        req.validate()?;

        let is_default = if req.is_default {
            self.addresses
                .unset_default(user_id)
                .await
                .context("Failed to unset default address")?;
            true
        } else {
            !self
                .addresses
                .has_default(user_id)
                .await
                .context("Failed to check default address")?
        };

        let country = req
            .country
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        let address = self
            .addresses
            .create(NewAddress {
                user_id,
                full_name: req.full_name,
                phone: req.phone,
                address_line1: req.address_line1,
                address_line2: req.address_line2,
                city: req.city,
                province: req.province,
                zip_code: req.zip_code,
                country,
                is_default,
            })
            .await
            .context("Failed to create address")?;

        tracing::info!(user_id, address_id = address.id, is_default, "📍 Address created");
        Ok(address)
    }

    /// Adresse de l'utilisateur, 404 si absente et 403 si elle appartient à un autre
    pub async fn get_owned(&self, user_id: i32, id: i32) -> AppResult<addresses::Model> {
        let address = self
            .addresses
            .find_by_id(id)
            .await
            .context("Failed to load address")?
            .ok_or_else(|| AppError::not_found("Address not found"))?;

        if address.user_id != user_id {
            return Err(AppError::forbidden("Address does not belong to user"));
        }
        Ok(address)
    }

    pub async fn update(&self, user_id: i32, id: i32, req: AddressRequest) -> AppResult<addresses::Model> {
        req.validate()?;
        let mut address = self.get_owned(user_id, id).await?;

        // is_default = false ne retire pas le flag
        if req.is_default && !address.is_default {
            self.addresses
                .unset_default(user_id)
                .await
                .context("Failed to unset default address")?;
            address.is_default = true;
        }

        address.full_name = req.full_name;
        address.phone = req.phone;
        address.address_line1 = req.address_line1;
        address.address_line2 = req.address_line2;
        address.city = req.city;
        address.province = req.province;
        address.zip_code = req.zip_code;
        if let Some(country) = req.country.filter(|c| !c.trim().is_empty()) {
            address.country = country.trim().to_string();
        }

        self.addresses.update(address).await.context("Failed to update address")
    }

    pub async fn delete(&self, user_id: i32, id: i32) -> AppResult<()> {
        let address = self.get_owned(user_id, id).await?;
        self.addresses.delete(id).await.context("Failed to delete address")?;

        if address.is_default {
            let latest = self
                .addresses
                .latest_for_user(user_id)
                .await
                .context("Failed to load addresses")?;
            if let Some(mut next) = latest {
                next.is_default = true;
                let next = self.addresses.update(next).await.context("Failed to promote address")?;
                tracing::info!(user_id, address_id = next.id, "📍 Default address promoted");
            }
        }
        Ok(())
    }

    pub async fn list(&self, user_id: i32) -> AppResult<Vec<addresses::Model>> {
        self.addresses
            .list_for_user(user_id)
            .await
            .context("Failed to list addresses")
    }

    pub async fn switch_default(&self, user_id: i32, id: i32) -> AppResult<addresses::Model> {
        let mut address = self.get_owned(user_id, id).await?;

        self.addresses
            .unset_default(user_id)
            .await
            .context("Failed to unset default address")?;
        address.is_default = true;
        self.addresses.update(address).await.context("Failed to switch default address")
    }
}
