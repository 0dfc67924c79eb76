use std::collections::HashSet;

use webfarm_core::{config::LicenseConfig, traits::LicenseService};

/// 由配置列出的已授权功能，名称不区分大小写
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLicenseService {
    features: HashSet<String>,
}

impl ConfiguredLicenseService {
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            features: features
                .into_iter()
                .map(|f| f.as_ref().trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &LicenseConfig) -> Self {
        Self::new(&config.features)
    }
}

impl LicenseService for ConfiguredLicenseService {
    fn is_feature_available(&self, feature: &str) -> bool {
        self.features.contains(&feature.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_lookup_is_case_insensitive() {
        let license = ConfiguredLicenseService::new(["ContactManagement", " "]);
        assert!(license.is_feature_available("contactmanagement"));
        assert!(!license.is_feature_available("OnlineMarketing"));
        assert!(!ConfiguredLicenseService::default().is_feature_available(""));
    }
}
