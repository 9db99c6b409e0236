/// Registration, login, bearer sessions and profile updates
pub mod account;

/// Cart lines, merging and stock checks
pub mod cart;

/// Categories and subcategories, including cascade deletion
pub mod catalog;

/// Per-entity async locks serializing composite mutations
pub mod locks;

/// Order placement, listing and status transitions
pub mod order;

/// Mock payment processing
pub mod payment;

/// Product creation, detail and owner-gated mutation
pub mod product;

/// Product listing with filters, sorting and pagination
pub mod query;

/// Rating aggregation and presentation
pub mod rating;

/// Seller stores
pub mod store;
