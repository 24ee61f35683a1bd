//! Abstractions for offset pagination.

use std::{cmp, num::NonZeroUsize, vec};

/// Pagination arguments.
///
/// Requested elements are addressed by an offset of the first one (`from`),
/// which is rounded down to the beginning of the page it belongs to. So
/// `from = 3, size = 2` selects the second page (elements `2..4`), not the
/// elements `3..5`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Arguments {
    /// Offset of the first requested element.
    pub from: usize,

    /// Number of elements in a page.
    pub size: NonZeroUsize,
}

impl Arguments {
    /// Creates new [`Arguments`].
    #[must_use]
    pub const fn new(from: usize, size: NonZeroUsize) -> Self {
        Self { from, size }
    }

    /// Returns the zero-based number of the page requested by these
    /// [`Arguments`].
    #[must_use]
    pub const fn page(&self) -> usize {
        self.from / self.size.get()
    }

    /// Returns the number of elements to skip before the requested page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page().saturating_mul(self.size.get())
    }

    /// Returns the maximum number of elements in the requested page.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.size.get()
    }

    /// Cuts the requested page out of the already ordered `items`.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect()
    }
}

/// A page of `T`s.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<T> {
    /// Elements of this [`Page`].
    pub nodes: Vec<T>,

    /// Zero-based number of this [`Page`].
    pub number: usize,

    /// Requested size of this [`Page`].
    ///
    /// The last page may contain fewer [`Page::nodes`].
    pub size: NonZeroUsize,
}

impl<T> Page<T> {
    /// Creates a new [`Page`] out of the `nodes` selected by the provided
    /// [`Arguments`].
    #[must_use]
    pub fn new(args: &Arguments, nodes: impl IntoIterator<Item = T>) -> Self {
        Self {
            nodes: nodes.into_iter().take(args.limit()).collect(),
            number: args.page(),
            size: args.size,
        }
    }

    /// Returns the number of elements in this [`Page`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Indicates whether this [`Page`] has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Maps elements of this [`Page`] with the provided function.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            nodes: self.nodes.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Order of elements.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Order {
    /// Ascending order.
    Ascending,

    /// Descending order.
    Descending,
}

impl Order {
    /// Applies this [`Order`] to the natural (ascending) [`cmp::Ordering`].
    #[must_use]
    pub const fn apply(self, ordering: cmp::Ordering) -> cmp::Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }

    /// Returns SQL operator representing this [`Order`].
    #[cfg(feature = "postgres")]
    #[must_use]
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($node:ty, $filter:ty) => {
        #[doc = ::core::concat!("A page of `", ::core::stringify!($node), "`s.")]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter>;
    };
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::{Arguments, Page};

    fn args(from: usize, size: usize) -> Arguments {
        Arguments::new(from, NonZeroUsize::new(size).unwrap())
    }

    #[test]
    fn rounds_offset_down_to_page_start() {
        assert_eq!(args(0, 2).page(), 0);
        assert_eq!(args(1, 2).page(), 0);
        assert_eq!(args(3, 2).page(), 1);
        assert_eq!(args(3, 2).offset(), 2);
        assert_eq!(args(4, 2).offset(), 4);
        assert_eq!(args(9, 10).offset(), 0);
    }

    #[test]
    fn slices_requested_page() {
        let items = [1, 2, 3, 4, 5];

        assert_eq!(args(0, 2).slice(items), vec![1, 2]);
        assert_eq!(args(3, 2).slice(items), vec![3, 4]);
        assert_eq!(args(4, 2).slice(items), vec![5]);
        assert!(args(6, 2).slice(items).is_empty());
    }

    #[test]
    fn page_never_exceeds_its_size() {
        let page = Page::new(&args(2, 2), [7, 8, 9]);

        assert_eq!(page.nodes, vec![7, 8]);
        assert_eq!(page.number, 1);
        assert_eq!(page.len(), 2);
    }
}
