//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `lifeos_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use lifeos_core::service::EntityCatalog;

fn main() {
    // Keeps a tiny probe of the core wiring that needs no database.
    println!("lifeos_core ping={}", lifeos_core::ping());
    println!("lifeos_core version={}", lifeos_core::core_version());
    println!("lifeos_core entity_kinds={}", EntityCatalog::standard().len());
}
