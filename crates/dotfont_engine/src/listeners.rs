/// Ordered list of subscriber callbacks.
///
/// Delivery is synchronous, on the calling thread, in subscription order.
/// Subscribers are addressed by the id `subscribe` hands out, so removing
/// one never shifts the others.
pub struct Listeners<E> {
    entries: Vec<(usize, Box<dyn FnMut(&E) + Send>)>,
    next_id: usize,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&E) + Send + 'static) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: usize) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn notify(&mut self, event: &E) {
        for (_, subscriber) in &mut self.entries {
            subscriber(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listeners({})", self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_delivery_in_subscription_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners: Listeners<i32> = Listeners::new();

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            listeners.subscribe(move |event: &i32| seen.lock().unwrap().push((tag, *event)));
        }

        listeners.notify(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7), ("third", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let seen = Arc::new(Mutex::new(0));
        let mut listeners: Listeners<()> = Listeners::new();

        let keep = seen.clone();
        let id = listeners.subscribe(move |_: &()| *keep.lock().unwrap() += 1);
        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));

        listeners.notify(&());
        assert_eq!(*seen.lock().unwrap(), 0);
    }
}
