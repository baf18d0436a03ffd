//! Counting of completed communication cycles, for drivers implementing [crate::MasterLink::wait_cycles]

use core::{pin::pin, time::Duration};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;


/**
    number of cycles completed by a master, that threads and tasks can wait on

    the cycle thread calls [Self::advance] once per cycle, blocking threads wait with [Self::wait] and async tasks with [Self::wait_async]
*/
#[derive(Debug, Default)]
pub struct CycleCounter {
    count: Mutex<u64>,
    blocking: Condvar,
    tasks: Notify,
}

impl CycleCounter {
    pub fn new() -> Self  {Self::default()}

    /// number of cycles completed so far
    pub fn count(&self) -> u64  {*self.lock()}

    /// mark one more cycle as completed and wake up all waiters, return the new count
    pub fn advance(&self) -> u64 {
        let count = {
            let mut count = self.lock();
            *count += 1;
            *count
        };
        self.blocking.notify_all();
        self.tasks.notify_waiters();
        count
    }

    /**
        block the calling thread until `cycles` more cycles have completed after this call, or until `timeout` elapsed

        return false on timeout, which is a normal outcome
    */
    pub fn wait(&self, cycles: u32, timeout: Duration) -> bool {
        let count = self.lock();
        let target = *count + u64::from(cycles);
        let (count, _) = self.blocking
            .wait_timeout_while(count, timeout, |count| *count < target)
            .unwrap_or_else(PoisonError::into_inner);
        *count >= target
    }

    /// same as [Self::wait] but suspending the current task instead of the thread
    pub async fn wait_async(&self, cycles: u32, timeout: Duration) -> bool {
        let target = self.count() + u64::from(cycles);
        tokio::time::timeout(timeout, async {
            loop {
                // register before checking, so that no advance can be missed in between
                let mut notified = pin!(self.tasks.notified());
                notified.as_mut().enable();
                if self.count() >= target
                    {break}
                notified.await;
            }
        }).await.is_ok()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
