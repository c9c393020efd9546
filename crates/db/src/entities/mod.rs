//! `SeaORM` entity definitions.

pub mod categories;
pub mod expenses;
pub mod plan_state;

pub mod prelude {
    //! Entity re-exports.

    pub use super::categories::Entity as Categories;
    pub use super::expenses::Entity as Expenses;
    pub use super::plan_state::Entity as PlanState;
}
