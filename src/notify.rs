/*!
    Publish/subscribe of typed events, owned by the object emitting them.

    A [Hub] keeps, for each event type, the ordered list of the [Subscriber]s attached to it. Neither side owns the other: the hub only keeps weak handles on its subscribers, and a subscriber only keeps a weak back-reference to the hub it is linked to. Dropping a subscriber detaches it, and dropping a hub silently orphans its subscribers.

    ```
    use coimage::{Hub, Subscriber};
    use std::sync::{Arc, atomic::{AtomicUsize, Ordering::*}};

    struct Tick(usize);

    let hub = Hub::new();
    let total = Arc::new(AtomicUsize::new(0));
    let subscriber = Subscriber::new({
        let total = total.clone();
        move |tick: &Tick| {total.fetch_add(tick.0, Relaxed);}
        });
    hub.attach(&subscriber);
    assert_eq!(hub.notify(&Tick(3)), 1);
    drop(subscriber);
    assert_eq!(hub.notify(&Tick(3)), 0);
    assert_eq!(total.load(Relaxed), 3);
    ```
*/

use core::{
    any::{Any, TypeId},
    cell::UnsafeCell,
    fmt,
    };
use std::{
    collections::HashMap,
    sync::{Arc, Weak, Mutex, MutexGuard, PoisonError},
    };


/// subscriber lists of a hub, each boxed entry is a `Weak<Slot<E>>` for the event type `E` of its key
type Lists = HashMap<TypeId, Vec<Box<dyn Any + Send + Sync>>>;

/**
    registry of subscribers for any number of event types

    the hub is meant to be owned by the object emitting the events, it is not clonable so that its identity is the identity of its owner
*/
pub struct Hub {
    inner: Arc<HubInner>,
}
struct HubInner {
    thread_safe: bool,
    lock: Mutex<()>,
    lists: UnsafeCell<Lists>,
}

// concurrency safety: the lists are only accessed under `lock` when thread safe, and the caller guarantees a single thread otherwise (whose constructor is unsafe)
unsafe impl Sync for HubInner {}

/**
    observer of events of type `E`, calling a callback for each event notified by the hub it is attached to

    it can be attached several times to the same hub, in which case it receives every event as many times
*/
pub struct Subscriber<E: 'static> {
    slot: Arc<Slot<E>>,
}
struct Slot<E> {
    callback: Box<dyn Fn(&E) + Send + Sync>,
    /// hub this subscriber was last attached to
    hub: Mutex<Weak<HubInner>>,
}

impl Hub {
    /// create a hub whose attach, detach and notify can be called from any thread
    pub fn new() -> Self {
        Self::with_locking(true)
    }
    /**
        create a hub performing no locking at all

        # Safety

        the caller must ensure this hub and the subscribers attached to it are only used by one thread at a time
    */
    pub unsafe fn unsynchronized() -> Self {
        Self::with_locking(false)
    }
    fn with_locking(thread_safe: bool) -> Self {
        Self {inner: Arc::new(HubInner {
            thread_safe,
            lock: Mutex::new(()),
            lists: UnsafeCell::new(HashMap::new()),
        })}
    }

    pub fn is_thread_safe(&self) -> bool  {self.inner.thread_safe}

    /// append a subscriber to the list of its event type, and link it to this hub
    pub fn attach<E: 'static>(&self, subscriber: &Subscriber<E>) {
        self.inner.with_lists(|lists| {
            lists.entry(TypeId::of::<E>())
                .or_default()
                .push(Box::new(Arc::downgrade(&subscriber.slot)));
        });
        *subscriber.slot.link() = Arc::downgrade(&self.inner);
        log::debug!("subscriber of {} attached", core::any::type_name::<E>());
    }
    /**
        remove the first entry of this subscriber, and unlink it from this hub

        return false if the subscriber was not attached
    */
    pub fn detach<E: 'static>(&self, subscriber: &Subscriber<E>) -> bool {
        let found = self.inner.remove_first::<E>(Arc::as_ptr(&subscriber.slot));
        if found {
            let mut link = subscriber.slot.link();
            if link.as_ptr() == Arc::as_ptr(&self.inner)
                {*link = Weak::new()}
            log::debug!("subscriber of {} detached", core::any::type_name::<E>());
        }
        found
    }
    /// remove all subscribers of an event type, return how many entries were removed
    pub fn detach_all<E: 'static>(&self) -> usize {
        let removed = self.inner.with_lists(|lists| lists.remove(&TypeId::of::<E>()))
            .unwrap_or_default();
        for slot in removed.iter().filter_map(Slot::<E>::downcast).filter_map(|weak| weak.upgrade()) {
            let mut link = slot.link();
            if link.as_ptr() == Arc::as_ptr(&self.inner)
                {*link = Weak::new()}
        }
        removed.len()
    }
    /// number of entries currently attached for an event type, including dropped subscribers not yet pruned by [Self::notify]
    pub fn subscribers<E: 'static>(&self) -> usize {
        self.inner.with_lists(|lists| lists.get(&TypeId::of::<E>()).map(Vec::len).unwrap_or(0))
    }

    /**
        deliver an event to every subscriber of its type, in attachment order

        Subscribers linked to an other hub since their attachment, or dropped meanwhile, are skipped. Entries of dropped subscribers are removed from the list. The list is copied before calling the callbacks, so callbacks may attach or detach subscribers: these changes only apply to the next notification.

        return the number of callbacks called
    */
    pub fn notify<E: 'static>(&self, event: &E) -> usize {
        let snapshot: Vec<Weak<Slot<E>>> = self.inner.with_lists(|lists| {
            let Some(list) = lists.get_mut(&TypeId::of::<E>())
                else {return Vec::new()};
            list.retain(|entry| Slot::<E>::downcast(entry).map_or(true, |weak| weak.strong_count() != 0));
            list.iter().filter_map(Slot::<E>::downcast).cloned().collect()
        });
        let mut delivered = 0;
        for slot in snapshot.iter().filter_map(Weak::upgrade) {
            if slot.link().as_ptr() != Arc::as_ptr(&self.inner)
                {continue}
            (slot.callback)(event);
            delivered += 1;
        }
        delivered
    }
}

impl Default for Hub {
    fn default() -> Self  {Self::new()}
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hub{{{:p}, thread_safe: {}}}", Arc::as_ptr(&self.inner), self.inner.thread_safe)
    }
}

impl HubInner {
    fn with_lists<R>(&self, task: impl FnOnce(&mut Lists) -> R) -> R {
        let _guard = self.thread_safe.then(|| self.lock.lock().unwrap_or_else(PoisonError::into_inner));
        // memory safety: exclusive access is given by the lock or by the unsynchronized hub contract
        task(unsafe {&mut *self.lists.get()})
    }
    fn remove_first<E: 'static>(&self, slot: *const Slot<E>) -> bool {
        self.with_lists(|lists| {
            let Some(list) = lists.get_mut(&TypeId::of::<E>())
                else {return false};
            match list.iter().position(|entry| Slot::<E>::downcast(entry).map_or(false, |weak| weak.as_ptr() == slot)) {
                Some(position) => {list.remove(position); true},
                None => false,
            }
        })
    }
    fn remove_every<E: 'static>(&self, slot: *const Slot<E>) {
        self.with_lists(|lists| {
            if let Some(list) = lists.get_mut(&TypeId::of::<E>()) {
                list.retain(|entry| Slot::<E>::downcast(entry).map_or(true, |weak| weak.as_ptr() != slot));
            }
        })
    }
}

impl<E: 'static> Subscriber<E> {
    pub fn new(callback: impl Fn(&E) + Send + Sync + 'static) -> Self {
        Self {slot: Arc::new(Slot {
            callback: Box::new(callback),
            hub: Mutex::new(Weak::new()),
        })}
    }
    /// true if this subscriber is linked to a hub still alive
    pub fn is_attached(&self) -> bool {
        self.slot.link().strong_count() != 0
    }
}

impl<E: 'static> Slot<E> {
    fn link(&self) -> MutexGuard<'_, Weak<HubInner>> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn downcast(entry: &Box<dyn Any + Send + Sync>) -> Option<&Weak<Self>> {
        entry.downcast_ref::<Weak<Self>>()
    }
}

impl<E: 'static> Drop for Subscriber<E> {
    fn drop(&mut self) {
        let hub = core::mem::take(&mut *self.slot.link()).upgrade();
        if let Some(hub) = hub {
            hub.remove_every::<E>(Arc::as_ptr(&self.slot));
        }
    }
}

impl<E: 'static> fmt::Debug for Subscriber<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscriber<{}>{{{:p}}}", core::any::type_name::<E>(), Arc::as_ptr(&self.slot))
    }
}
