//! Azure CLI interaction.
//!
//! This module handles all Azure-related operations:
//! - [`shell`] - Subprocess execution for az commands
//! - [`client`] - The provider client boundary and its az-backed implementation
//! - [`subscriptions`] - Subscription selection

pub mod client;
pub mod shell;
pub mod subscriptions;

// Re-export the types the rest of the crate works with
pub use client::{
    AddressDescriptor, AddressSpec, AzCliClient, InterfaceDescriptor, InterfaceRef,
    PublicIpClient, RuleDescriptor, SubscriptionDescriptor,
};
pub use subscriptions::select_subscriptions;
