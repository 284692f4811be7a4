//! CustomResourceDefinition for the Database kind
//!
//! The spec schema preserves unknown fields so the API can store arbitrary
//! database configuration without a compile-time schema.

use std::collections::BTreeMap;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceColumnDefinition, CustomResourceDefinition, CustomResourceDefinitionNames,
    CustomResourceDefinitionSpec, CustomResourceDefinitionVersion, CustomResourceSubresourceStatus,
    CustomResourceSubresources, CustomResourceValidation, JSONSchemaProps, JSON,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::database::{DATABASE_GROUP, DATABASE_KIND, DATABASE_PLURAL, DATABASE_VERSION};
use crate::error::Result;

fn string_prop(description: &str) -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some("string".to_string()),
        description: Some(description.to_string()),
        ..Default::default()
    }
}

fn column(name: &str, type_: &str, json_path: &str) -> CustomResourceColumnDefinition {
    CustomResourceColumnDefinition {
        name: name.to_string(),
        type_: type_.to_string(),
        json_path: json_path.to_string(),
        ..Default::default()
    }
}

fn database_schema() -> JSONSchemaProps {
    let phases = ["Pending", "Ready", "Failed", "Deleting"]
        .iter()
        .map(|p| JSON(serde_json::Value::String(p.to_string())))
        .collect();

    let status = JSONSchemaProps {
        type_: Some("object".to_string()),
        properties: Some(BTreeMap::from([
            (
                "phase".to_string(),
                JSONSchemaProps {
                    enum_: Some(phases),
                    ..string_prop("Observed lifecycle phase")
                },
            ),
            ("message".to_string(), string_prop("Human readable detail")),
        ])),
        ..Default::default()
    };

    let spec = JSONSchemaProps {
        type_: Some("object".to_string()),
        description: Some("Desired database configuration (engine, size, version, ...)".to_string()),
        min_properties: Some(1),
        x_kubernetes_preserve_unknown_fields: Some(true),
        ..Default::default()
    };

    JSONSchemaProps {
        type_: Some("object".to_string()),
        required: Some(vec!["spec".to_string()]),
        properties: Some(BTreeMap::from([
            ("spec".to_string(), spec),
            ("status".to_string(), status),
        ])),
        ..Default::default()
    }
}

/// The Database CRD, ready to be applied to a cluster.
pub fn database_crd() -> CustomResourceDefinition {
    CustomResourceDefinition {
        metadata: ObjectMeta {
            name: Some(format!("{DATABASE_PLURAL}.{DATABASE_GROUP}")),
            ..Default::default()
        },
        spec: CustomResourceDefinitionSpec {
            group: DATABASE_GROUP.to_string(),
            names: CustomResourceDefinitionNames {
                kind: DATABASE_KIND.to_string(),
                list_kind: Some(format!("{DATABASE_KIND}List")),
                plural: DATABASE_PLURAL.to_string(),
                singular: Some("database".to_string()),
                short_names: Some(vec!["db".to_string()]),
                ..Default::default()
            },
            scope: "Namespaced".to_string(),
            versions: vec![CustomResourceDefinitionVersion {
                name: DATABASE_VERSION.to_string(),
                served: true,
                storage: true,
                schema: Some(CustomResourceValidation {
                    open_api_v3_schema: Some(database_schema()),
                }),
                subresources: Some(CustomResourceSubresources {
                    status: Some(CustomResourceSubresourceStatus(serde_json::json!({}))),
                    scale: None,
                }),
                additional_printer_columns: Some(vec![
                    column("Engine", "string", ".spec.engine"),
                    column("Phase", "string", ".status.phase"),
                    column("Age", "date", ".metadata.creationTimestamp"),
                ]),
                ..Default::default()
            }],
            ..Default::default()
        },
        status: None,
    }
}

/// Render the CRD as YAML.
pub fn database_crd_yaml() -> Result<String> {
    Ok(serde_yaml::to_string(&database_crd())?)
}
