use anyhow::Result;

use crate::cargo;

const FEATURE_COMBINATIONS: &[&[&str]] = &[
    &[], // default
    &["foundation"],
    &["observability"],
    &["serde"],
    &["observability", "serde"],
];

/// Check that every supported `oplink-common` feature combination compiles.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} oplink-common feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, features) in FEATURE_COMBINATIONS.iter().enumerate() {
        let joined = features.join(",");
        let display_label = if features.is_empty() { "default" } else { joined.as_str() };

        let mut args = vec!["check", "-p", "oplink-common", "--no-default-features"];
        if !features.is_empty() {
            args.extend(["--features", joined.as_str()]);
        }

        println!("\n[{}/{}] cargo {}", index + 1, FEATURE_COMBINATIONS.len(), args.join(" "));
        cargo(&args, &format!("Feature combination '{display_label}' failed to compile"))?;
        println!("✅ Features '{display_label}' compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_COMBINATIONS.len());

    Ok(())
}
