//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cart;
pub mod cart_item;
pub mod category;
pub mod json;
pub mod order;
pub mod order_item;
pub mod product;
pub mod rating;
pub mod session;
pub mod store;
pub mod subcategory;
pub mod user;
pub mod variation;

// Re-export specific types to avoid conflicts
pub use cart::{Column as CartColumn, Entity as Cart, Model as CartModel};
pub use cart_item::{Column as CartItemColumn, Entity as CartItem, Model as CartItemModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use json::{AttributeMap, StringList};
pub use order::{
    Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus, PaymentStatus,
};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use rating::{Column as RatingColumn, Entity as Rating, Model as RatingModel};
pub use session::{Column as SessionColumn, Entity as Session, Model as SessionModel};
pub use store::{Column as StoreColumn, Entity as Store, Model as StoreModel};
pub use subcategory::{
    Column as SubcategoryColumn, Entity as Subcategory, Model as SubcategoryModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
pub use variation::{Column as VariationColumn, Entity as Variation, Model as VariationModel};
