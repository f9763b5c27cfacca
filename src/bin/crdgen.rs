// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the `HetznerCluster` CRD YAML from the Rust types defined in src/crd.rs,
//! so deploy/crds/ always matches the code.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! The generated file is written to deploy/crds/ with a header.

use hetzner_operator::crd::HetznerCluster;
use kube::CustomResourceExt;
use serde_json::Value;
use std::fs;
use std::path::Path;

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("deploy/crds");

    fs::create_dir_all(output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<HetznerCluster>("hetznerclusters.crd.yaml", output_dir)?;

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>>
where
    T: CustomResourceExt,
{
    let crd = T::crd();

    let mut crd_json: Value = serde_json::to_value(&crd)?;

    // Printer columns for `kubectl get hetznerclusters`
    if let Some(version) = crd_json["spec"]["versions"]
        .as_array_mut()
        .and_then(|versions| versions.first_mut())
    {
        version["storage"] = Value::Bool(true);
        version["served"] = Value::Bool(true);
        version["additionalPrinterColumns"] = serde_json::json!([
            { "name": "Ready", "type": "boolean", "jsonPath": ".status.ready" },
            { "name": "Endpoint", "type": "string", "jsonPath": ".spec.controlPlaneEndpoint.host" },
            { "name": "Servers", "type": "integer", "jsonPath": ".status.ownedServerCount" },
            { "name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp" }
        ]);
    }

    let yaml = serde_yaml::to_string(&crd_json)?;

    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let output_path = output_dir.join(filename);
    fs::write(&output_path, content)?;

    println!("  ✓ Generated {filename}");

    Ok(())
}
