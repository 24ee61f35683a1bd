//! [`Item`] read model definition.
//!
//! [`Item`]: crate::domain::Item

pub mod list {
    //! [`Item`]s list definitions.

    use std::cmp::Ordering;

    use common::{define_pagination, pagination::Order};

    use crate::domain::{user, Item};
    #[cfg(doc)]
    use crate::domain::User;

    define_pagination!(Item, Filter);

    /// [`Order`] of [`Item`]s by their ID.
    pub const ORDER: Order = Order::Ascending;

    /// Compares [`Item`]s in the listing [`ORDER`].
    #[must_use]
    pub fn compare(a: &Item, b: &Item) -> Ordering {
        ORDER.apply(a.id.cmp(&b.id))
    }

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the [`User`] owning the listed [`Item`]s.
        pub owner_id: user::Id,
    }
}
