/// Cancel-and-reschedule debouncing over a timer scheduler.
use std::cell::RefCell;
use std::rc::Rc;

/// One-shot timers (`setTimeout`/`clearTimeout` in the browser).
pub trait Scheduler {
    type Handle;

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Result<Self::Handle, String>;
    fn cancel(&self, handle: Self::Handle);
}

/// Runs `task` once `delay_ms` have passed without another trigger.
/// At most one run is pending at any time.
pub struct Debouncer<S: Scheduler> {
    scheduler: S,
    delay_ms: u32,
    task: Rc<dyn Fn()>,
    pending: Rc<RefCell<Option<S::Handle>>>,
}

impl<S: Scheduler> Debouncer<S>
where
    S::Handle: 'static,
{
    pub fn new(scheduler: S, delay_ms: u32, task: impl Fn() + 'static) -> Self {
        Debouncer {
            scheduler,
            delay_ms,
            task: Rc::new(task),
            pending: Rc::new(RefCell::new(None)),
        }
    }

    pub fn trigger(&self) {
        let previous = self.pending.borrow_mut().take();
        if let Some(handle) = previous {
            self.scheduler.cancel(handle);
        }

        let pending = self.pending.clone();
        let task = self.task.clone();
        let scheduled = self.scheduler.schedule(
            self.delay_ms,
            Box::new(move || {
                pending.borrow_mut().take();
                task();
            }),
        );

        match scheduled {
            Ok(handle) => *self.pending.borrow_mut() = Some(handle),
            Err(e) => log::warn!("Failed to schedule debounced task: {}", e),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }
}
