pub mod history;
pub mod products;
pub mod users;

pub use history::Entity as History;
pub use products::Entity as Products;
pub use users::Entity as Users;
