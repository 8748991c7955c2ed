// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates Kubernetes CRD YAML files from the Rust types in src/crd.rs, so
//! the manifests in deploy/crds/ never drift from the code.
//!
//! Usage:
//!   cargo run --bin crdgen

use anyhow::Result;
use kube::CustomResourceExt;
use std::fs;
use std::path::Path;
use tenant_reconciler::crd::{AWSCluster, AWSControlPlane, AWSMachineDeployment};

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<()> {
    let output_dir = Path::new("deploy/crds");
    fs::create_dir_all(output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<AWSCluster>("awsclusters.crd.yaml", output_dir)?;
    generate_crd::<AWSControlPlane>("awscontrolplanes.crd.yaml", output_dir)?;
    generate_crd::<AWSMachineDeployment>("awsmachinedeployments.crd.yaml", output_dir)?;

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    Ok(())
}

fn generate_crd<T: CustomResourceExt>(filename: &str, output_dir: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(&T::crd())?;
    let output_path = output_dir.join(filename);
    fs::write(&output_path, format!("{COPYRIGHT_HEADER}{yaml}"))?;

    println!("  ✓ Generated {filename}");
    Ok(())
}
