use crate::command::{CommandsRegistry, UndoHistory};
use crate::logging::LogLevel;
use crate::scheduler::Scheduler;
use crate::settings::Settings;
use std::cell::RefCell;
use std::rc::Rc;

/// Sink for failures that happen where nobody can handle them: command
/// factories and asynchronous executions.
pub trait ErrorReporter {
    fn report(&self, err: anyhow::Error);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, err: anyhow::Error) {
        tracing::error!(?err, "binding error");
    }
}

/// Logs like [`TracingErrorReporter`] and keeps the messages.
#[derive(Debug, Default)]
pub struct ErrorLog {
    messages: RefCell<Vec<String>>,
}

impl ErrorLog {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl ErrorReporter for ErrorLog {
    fn report(&self, err: anyhow::Error) {
        tracing::error!(?err, "binding error");
        self.messages.borrow_mut().push(format!("{err:#}"));
    }
}

/// What bindings share: command registry, undo history, error sink and
/// scheduler. Owned by the application and handed to every binding.
#[derive(Clone)]
pub struct BindingContext {
    pub registry: Rc<RefCell<CommandsRegistry>>,
    pub history: Rc<RefCell<UndoHistory>>,
    pub errors: Rc<dyn ErrorReporter>,
    pub scheduler: Scheduler,
    /// Used by bindings built without log levels of their own.
    pub log_levels: Vec<LogLevel>,
}

impl BindingContext {
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            registry: Rc::new(RefCell::new(CommandsRegistry::default())),
            history: Rc::new(RefCell::new(UndoHistory::default())),
            errors: Rc::new(TracingErrorReporter),
            scheduler: scheduler.clone(),
            log_levels: Vec::new(),
        }
    }

    pub fn from_settings(scheduler: &Scheduler, settings: &Settings) -> Self {
        Self {
            registry: Rc::new(RefCell::new(CommandsRegistry::new(
                settings.registry_size_max,
            ))),
            history: Rc::new(RefCell::new(UndoHistory::new(settings.undo_size_max))),
            errors: Rc::new(TracingErrorReporter),
            scheduler: scheduler.clone(),
            log_levels: settings.log_levels.clone(),
        }
    }

    pub fn with_error_reporter(mut self, errors: Rc<dyn ErrorReporter>) -> Self {
        self.errors = errors;
        self
    }

    /// Empties the registry and the history.
    pub fn clear(&self) {
        self.registry.borrow_mut().clear();
        self.history.borrow_mut().clear();
    }
}
