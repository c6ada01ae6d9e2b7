use anyhow::{Context, Result};
use pharmabill_core::{BankDetails, Gstin, OrganizationProfile, StateCode};

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub redis_url: String,
    pub http_addr: String,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;
        let http_addr =
            std::env::var("HTTP_ADDR").unwrap_or_else(|_| default_http_addr.to_string());

        Ok(Self {
            database_url,
            redis_url,
            http_addr,
        })
    }

    pub fn worker_from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;

        Ok(Self {
            database_url,
            redis_url,
            http_addr: String::new(),
        })
    }
}

/// Reads the seller profile printed on every document.
pub fn organization_from_env() -> Result<OrganizationProfile> {
    organization_from_lookup(|key| std::env::var(key).ok())
}

fn organization_from_lookup<F>(lookup: F) -> Result<OrganizationProfile>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let name = var("ORG_NAME").context("ORG_NAME is required")?;
    let gstin = var("ORG_GSTIN")
        .map(|raw| Gstin::parse(&raw))
        .transpose()
        .context("ORG_GSTIN is not a valid GSTIN")?;
    let explicit_state = var("ORG_STATE_CODE")
        .map(|raw| StateCode::parse(&raw))
        .transpose()
        .context("ORG_STATE_CODE is not a valid GST state code")?;

    let state = match (explicit_state, &gstin) {
        (Some(state), Some(gstin)) if state != gstin.state() => anyhow::bail!(
            "ORG_STATE_CODE {state} does not match the state of ORG_GSTIN {}",
            gstin.as_str()
        ),
        (Some(state), _) => state,
        (None, Some(gstin)) => gstin.state(),
        (None, None) => anyhow::bail!("ORG_STATE_CODE is required when ORG_GSTIN is not set"),
    };

    let bank = match (var("BANK_NAME"), var("BANK_ACCOUNT_NUMBER"), var("BANK_IFSC")) {
        (Some(bank_name), Some(account_number), Some(ifsc)) => Some(BankDetails {
            bank_name,
            account_number,
            ifsc: ifsc.to_ascii_uppercase(),
            branch: var("BANK_BRANCH"),
        }),
        (None, None, None) => None,
        _ => anyhow::bail!("BANK_NAME, BANK_ACCOUNT_NUMBER and BANK_IFSC must be set together"),
    };

    Ok(OrganizationProfile {
        name,
        gstin,
        state,
        address: var("ORG_ADDRESS"),
        bank,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<OrganizationProfile> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        organization_from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn state_is_taken_from_gstin_when_not_given() {
        let org = load(&[
            ("ORG_NAME", "Sai Pharma Distributors"),
            ("ORG_GSTIN", "27AAPFU0939F1ZV"),
            ("ORG_ADDRESS", "Shop 4, Station Road, Pune"),
        ])
        .unwrap();

        assert_eq!(org.state.code(), 27);
        assert_eq!(org.address.as_deref(), Some("Shop 4, Station Road, Pune"));
        assert!(org.bank.is_none());
    }

    #[test]
    fn unregistered_seller_needs_a_state_code() {
        let err = load(&[("ORG_NAME", "Corner Chemist")]).unwrap_err();
        assert!(err.to_string().contains("ORG_STATE_CODE"));

        let org = load(&[("ORG_NAME", "Corner Chemist"), ("ORG_STATE_CODE", "29")]).unwrap();
        assert_eq!(org.state.code(), 29);
        assert!(org.gstin.is_none());
    }

    #[test]
    fn conflicting_state_and_gstin_are_rejected() {
        let err = load(&[
            ("ORG_NAME", "Sai Pharma Distributors"),
            ("ORG_GSTIN", "27AAPFU0939F1ZV"),
            ("ORG_STATE_CODE", "29"),
        ])
        .unwrap_err();

        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn bank_details_are_all_or_nothing() {
        let org = load(&[
            ("ORG_NAME", "Sai Pharma Distributors"),
            ("ORG_STATE_CODE", "27"),
            ("BANK_NAME", "State Bank of India"),
            ("BANK_ACCOUNT_NUMBER", "30001234567"),
            ("BANK_IFSC", "sbin0000456"),
        ])
        .unwrap();
        let bank = org.bank.unwrap();
        assert_eq!(bank.ifsc, "SBIN0000456");
        assert!(bank.branch.is_none());

        assert!(
            load(&[
                ("ORG_NAME", "Sai Pharma Distributors"),
                ("ORG_STATE_CODE", "27"),
                ("BANK_NAME", "State Bank of India"),
            ])
            .is_err()
        );
    }

    #[test]
    fn invalid_gstin_is_reported() {
        let err = load(&[("ORG_NAME", "X"), ("ORG_GSTIN", "07AAACR5055K1Z7")]).unwrap_err();
        assert!(err.to_string().contains("ORG_GSTIN"));
    }
}
