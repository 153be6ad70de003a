//! The standard resource catalog mounted under `/api/v1`.
//!
//! Order matters: the registry resolves first-match-wins, and `role` is
//! listed twice. The second `role` registration is shadowed by the first.

use axum::Router;

use crate::config::DuplicatePolicy;
use crate::routing::router::{RegistryError, RouterRegistry};

/// Prefix every catalog resource is mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// Resource names in mount order.
pub const RESOURCES: &[&str] = &[
    "inventoryAdjustment",
    "user",
    "employee",
    "role",
    "department",
    "subsidiary",
    "location",
    "list",
    "class",
    "budget",
    "accountType",
    "account",
    "journalEntry",
    "loginAudit",
    "item",
    "supplier",
    "purchaseOrder",
    "productReceipt",
    "glImpact",
    "bill",
    "vendor",
    "product",
    "generalLedger",
    "customer",
    "salesOrder",
    "productDelivery",
    "invoice",
    "payment",
    "invoicePayment",
    "billPayment",
    "uom",
    "gstRates",
    "expense",
    "jobPosition",
    "workCenter",
    "bom",
    "jobOrder",
    "itemCategory",
    "priceChartUpload",
    "sizeList",
    "permission",
    "role",
    "cashSale",
    "company",
    "appCenter",
    "customDocumentType",
    "appNavigationCenter",
    "documentMapping",
    "netsuiteSync",
    "schema",
    "blog",
    "customList",
    "pmcliteaccess",
    "secure",
    "ocr",
    "inventoryTrack",
    "model",
    "manufacturerPays",
    "manufacturer",
    "status",
];

/// Mount prefix for one resource.
pub fn prefix_for(resource: &str) -> String {
    format!("{API_PREFIX}/{resource}")
}

/// Build the registry for the whole catalog.
///
/// `handlers_for` supplies the handler-set for each resource name.
pub fn standard_registry<F>(policy: DuplicatePolicy, mut handlers_for: F) -> Result<RouterRegistry, RegistryError>
where
    F: FnMut(&str) -> Router,
{
    let mut builder = RouterRegistry::builder(policy);
    for resource in RESOURCES {
        builder.register(&prefix_for(resource), *resource, handlers_for(resource))?;
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::router::Resolution;

    #[test]
    fn test_catalog_registers_every_resource() {
        let registry = standard_registry(DuplicatePolicy::Warn, |_| Router::new()).unwrap();

        assert_eq!(registry.len(), RESOURCES.len());
        let shadowed: Vec<_> = registry
            .registrations()
            .iter()
            .filter(|r| r.is_shadowed())
            .map(|r| r.prefix().to_string())
            .collect();
        assert_eq!(shadowed, vec!["/api/v1/role"]);
    }

    #[test]
    fn test_catalog_role_resolves_to_first_mount() {
        let registry = standard_registry(DuplicatePolicy::Warn, |_| Router::new()).unwrap();

        match registry.resolve("/api/v1/role/5") {
            Resolution::Matched { registration, .. } => assert!(!registration.is_shadowed()),
            Resolution::Unmatched => panic!("role should be mounted"),
        }
    }

    #[test]
    fn test_catalog_reject_policy_fails_on_role() {
        let err = standard_registry(DuplicatePolicy::Reject, |_| Router::new()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePrefix { ref name, .. } if name == "role"));
    }

    #[test]
    fn test_manufacturer_does_not_swallow_manufacturer_pays() {
        let registry = standard_registry(DuplicatePolicy::Warn, |_| Router::new()).unwrap();

        match registry.resolve("/api/v1/manufacturerPays/1") {
            Resolution::Matched { registration, remainder } => {
                assert_eq!(registration.name(), "manufacturerPays");
                assert_eq!(remainder, "/1");
            }
            Resolution::Unmatched => panic!("manufacturerPays should be mounted"),
        }
    }
}
