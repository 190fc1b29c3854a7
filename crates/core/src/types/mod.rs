//! Core types for GoMarket.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart_item;
pub mod id;
pub mod price;
pub mod status;

pub use cart_item::{CartItem, CartSummary, NewCartItem};
pub use id::{ProductId, ProductIdError};
pub use price::{Price, PriceError};
pub use status::CartStatus;
