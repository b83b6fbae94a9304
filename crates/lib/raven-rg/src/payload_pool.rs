use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Pass payloads recycled across frames, bucketed by payload type.
#[derive(Default)]
pub struct PassPayloadPool {
    free: HashMap<TypeId, Vec<Box<dyn Any>>>,
}

impl PassPayloadPool {
    pub fn new() -> Self {
        Default::default()
    }

    /// Take a payload of type `T` reset to its default value.
    pub fn take<T: Default + Any>(&mut self) -> Box<T> {
        let recycled = self.free.get_mut(&TypeId::of::<T>())
            .and_then(|payloads| payloads.pop())
            .and_then(|payload| payload.downcast::<T>().ok());

        match recycled {
            Some(mut payload) => {
                *payload = T::default();
                payload
            }
            None => Box::new(T::default()),
        }
    }

    /// Give a payload back to the pool.
    pub fn recycle(&mut self, payload: Box<dyn Any>) {
        // zero sized payloads never allocated anything
        if std::mem::size_of_val(&*payload) == 0 {
            return;
        }

        let type_id = (*payload).type_id();
        self.free.entry(type_id).or_default().push(payload);
    }

    /// Number of payloads waiting to be reused.
    pub fn len(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
