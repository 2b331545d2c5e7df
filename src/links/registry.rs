//! # Lock-free registry of the views attached to one shared model.
//!
//! [`ViewRegistry`] keeps an immutable [`Views`] value behind an [`ArcSwap`].
//! Every mutation builds a new value from the one it loaded and publishes it
//! with compare-and-swap, retrying on contention:
//!
//! ```text
//! attach(v):  Empty ──► One(v)
//!             One(a) ──► Many[a, v]
//!             Many[..] ──► Many[.., v]
//!
//! detach(v):  One(v) ──► Empty
//!             Many[a, v] ──► One(a)
//!             Many[a, v, b, ..] ──► Many[a, b, ..]
//! ```
//!
//! ## Rules
//! - Identity is pointer identity; a view is never present twice.
//! - `Many` always holds at least two views.
//! - Order of attachment is preserved.
//! - A [`snapshot`](ViewRegistry::snapshot) taken after `detach` returned never
//!   contains the detached view.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::view::{ViewRef, same_view};

/// Immutable set of attached views.
#[derive(Clone, Default)]
pub enum Views {
    #[default]
    Empty,
    One(ViewRef),
    Many(Arc<[ViewRef]>),
}

impl Views {
    pub fn len(&self) -> usize {
        match self {
            Views::Empty => 0,
            Views::One(_) => 1,
            Views::Many(views) => views.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Views::Empty)
    }

    pub fn get(&self, index: usize) -> Option<&ViewRef> {
        match self {
            Views::Empty => None,
            Views::One(view) => (index == 0).then_some(view),
            Views::Many(views) => views.get(index),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewRef> {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn contains(&self, view: &ViewRef) -> bool {
        self.iter().any(|v| same_view(v, view))
    }

    fn with(&self, view: ViewRef) -> Views {
        match self {
            Views::Empty => Views::One(view),
            Views::One(first) => Views::Many(Arc::from([Arc::clone(first), view])),
            Views::Many(views) => {
                let mut next = Vec::with_capacity(views.len() + 1);
                next.extend(views.iter().cloned());
                next.push(view);
                Views::Many(next.into())
            }
        }
    }

    fn without(&self, view: &ViewRef) -> Option<Views> {
        match self {
            Views::Empty => None,
            Views::One(only) => same_view(only, view).then_some(Views::Empty),
            Views::Many(views) => {
                let index = views.iter().position(|v| same_view(v, view))?;
                if views.len() == 2 {
                    Some(Views::One(Arc::clone(&views[1 - index])))
                } else {
                    let rest: Vec<ViewRef> = views
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != index)
                        .map(|(_, v)| Arc::clone(v))
                        .collect();
                    Some(Views::Many(rest.into()))
                }
            }
        }
    }
}

impl fmt::Debug for Views {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|v| v.name()).collect();
        match self {
            Views::Empty => f.write_str("Empty"),
            Views::One(_) => f.debug_tuple("One").field(&names[0]).finish(),
            Views::Many(_) => f.debug_tuple("Many").field(&names).finish(),
        }
    }
}

/// Result of [`ViewRegistry::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// The registry was empty; the view is the first one.
    First,
    /// The view joined other views.
    Added,
    /// The view was already attached; nothing changed.
    AlreadyAttached,
}

/// Result of [`ViewRegistry::detach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detach {
    /// The view was the last one; the registry is now empty.
    Last,
    /// The view was removed and others remain.
    Removed,
    /// The view was not attached; nothing changed.
    NotAttached,
}

/// Copy-on-write registry of views behind one CAS cell.
pub struct ViewRegistry {
    slot: ArcSwap<Views>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self {
            slot: ArcSwap::from_pointee(Views::Empty),
        }
    }

    /// The current contents; never changes after it is returned.
    pub fn snapshot(&self) -> Arc<Views> {
        self.slot.load_full()
    }

    pub fn len(&self) -> usize {
        self.slot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.load().is_empty()
    }

    /// Appends `view` unless it is already present.
    pub fn attach(&self, view: ViewRef) -> Attach {
        loop {
            let old = self.slot.load_full();
            if old.contains(&view) {
                return Attach::AlreadyAttached;
            }
            let new = Arc::new(old.with(Arc::clone(&view)));
            let prev = self.slot.compare_and_swap(&old, new);
            if Arc::ptr_eq(&prev, &old) {
                return if old.is_empty() {
                    Attach::First
                } else {
                    Attach::Added
                };
            }
        }
    }

    /// Removes `view` by identity.
    pub fn detach(&self, view: &ViewRef) -> Detach {
        loop {
            let old = self.slot.load_full();
            let Some(next) = old.without(view) else {
                return Detach::NotAttached;
            };
            let emptied = next.is_empty();
            let prev = self.slot.compare_and_swap(&old, Arc::new(next));
            if Arc::ptr_eq(&prev, &old) {
                return if emptied { Detach::Last } else { Detach::Removed };
            }
        }
    }

    /// Swaps in `Empty` and returns whatever was attached.
    pub fn take(&self) -> Arc<Views> {
        self.slot.swap(Arc::new(Views::Empty))
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewRegistry").field(&*self.slot.load()).finish()
    }
}
