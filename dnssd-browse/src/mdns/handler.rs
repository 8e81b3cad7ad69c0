use shared::types::BrowseEntry;

/// Receives add/remove notifications from a browse session.
///
/// Both methods are called on the session's own task, one at a time, in
/// the order events are processed: all additions caused by one inbound
/// message, then its removals, before the next event is looked at. They
/// never run concurrently with each other or with cache updates, and are
/// not called once the session has observed cancellation. Implementations
/// should return quickly; a slow handler delays the whole session.
pub trait BrowseHandler {
    /// An instance became reachable on `entry.iface_name`.
    fn on_add(&mut self, entry: BrowseEntry);

    /// A previously added instance is gone from `entry.iface_name`.
    fn on_remove(&mut self, entry: BrowseEntry);
}

/// Adapts a pair of closures to [`BrowseHandler`].
pub struct FnHandler<A, R> {
    add: A,
    remove: R,
}

impl<A, R> FnHandler<A, R>
where
    A: FnMut(BrowseEntry),
    R: FnMut(BrowseEntry),
{
    pub fn new(add: A, remove: R) -> Self {
        Self { add, remove }
    }
}

impl<A, R> BrowseHandler for FnHandler<A, R>
where
    A: FnMut(BrowseEntry),
    R: FnMut(BrowseEntry),
{
    fn on_add(&mut self, entry: BrowseEntry) {
        (self.add)(entry)
    }

    fn on_remove(&mut self, entry: BrowseEntry) {
        (self.remove)(entry)
    }
}

impl<H: BrowseHandler + ?Sized> BrowseHandler for &mut H {
    fn on_add(&mut self, entry: BrowseEntry) {
        (**self).on_add(entry)
    }

    fn on_remove(&mut self, entry: BrowseEntry) {
        (**self).on_remove(entry)
    }
}

impl<H: BrowseHandler + ?Sized> BrowseHandler for Box<H> {
    fn on_add(&mut self, entry: BrowseEntry) {
        (**self).on_add(entry)
    }

    fn on_remove(&mut self, entry: BrowseEntry) {
        (**self).on_remove(entry)
    }
}
