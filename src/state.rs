//! Application state for the point service.
//!
//! One product is loaded at startup and shared read-only by all handlers,
//! together with the profile used to read it and the default radius policy.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::{ColdpixError, Result};
use crate::extract::{ProductProfile, RadiusPolicy};
use crate::product::GriddedProduct;

/// The main application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Path of the served product
    pub file_path: PathBuf,
    /// The loaded product
    pub product: GriddedProduct,
    /// How to read the product
    pub profile: ProductProfile,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        config: Config,
        file_path: PathBuf,
        product: GriddedProduct,
        profile: ProductProfile,
    ) -> Self {
        Self {
            config,
            file_path,
            product,
            profile,
        }
    }

    /// Policy used when a request does not name one
    pub fn default_policy(&self) -> RadiusPolicy {
        self.config.extraction.policy
    }

    /// Check that the product has what the profile reads
    pub fn validate(&self) -> Result<()> {
        self.product.validate()?;

        for name in [&self.profile.variable, &self.profile.lon_var, &self.profile.lat_var] {
            if !self.product.has_variable(name) {
                return Err(ColdpixError::DataNotFound {
                    message: format!(
                        "Profile {} needs variable {} which the product does not have",
                        self.profile, name
                    ),
                });
            }
        }
        self.product.axis_values(&self.profile.lon_var)?;
        self.product.axis_values(&self.profile.lat_var)?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::composite_state;
    use super::*;

    #[test]
    fn test_validate() {
        let state = composite_state();
        assert!(state.validate().is_ok());
        assert_eq!(state.default_policy(), RadiusPolicy::NearestWithin(5.0));

        let mut wrong_profile = state.clone();
        wrong_profile.profile = ProductProfile::rtg();
        assert!(wrong_profile.validate().is_err());
    }
}
