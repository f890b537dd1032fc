//! # Co-expressions
//!
//! A co-expression is a method call that runs on its own OS thread with its
//! own [`Context`]. Control moves between co-expressions by strict hand-off:
//! each one owns a one-slot inbox, and `activate` sends a value into the
//! target's inbox and then blocks on its own until something is sent back.
//! Exactly one side runs at any time.
//!
//! ```text
//! created --activate--> running --yield--> suspended --activate--> running
//!                          |
//!                          +--fail/return--> terminated
//! ```

use super::context::Context;
use super::errors::EngineError;
use super::registry::Program;
use super::types::{Signal, Value};
use crate::config::EngineConfig;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, trace, warn};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoState {
    Created,
    Running,
    Suspended,
    Terminated,
}

/// Message placed in a co-expression's inbox
enum Transfer {
    Value(Value),
    Terminated,
    Fault(EngineError),
}

/// What a co-expression thread runs
#[derive(Clone)]
struct Launch {
    program: Arc<Program>,
    config: Arc<EngineConfig>,
    method: Arc<str>,
    /// Bound arguments; `None` takes the first transmitted value instead
    args: Option<Vec<Value>>,
    /// `&main` inside the co-expression; `None` when it is the main one
    main: Option<CoExpression>,
}

struct Shared {
    id: u64,
    label: Arc<str>,
    state: Mutex<CoState>,
    activator: Mutex<Option<Weak<Shared>>>,
    results: AtomicU64,
    inbox: SyncSender<Transfer>,
    mailbox: Mutex<Receiver<Transfer>>,
    launch: Option<Launch>,
}

/// Handle to a co-expression; clones refer to the same one
#[derive(Clone)]
pub struct CoExpression(Arc<Shared>);

impl CoExpression {
    fn new(label: &str, state: CoState, launch: Option<Launch>) -> Self {
        let (inbox, mailbox) = sync_channel(1);
        CoExpression(Arc::new(Shared {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            state: Mutex::new(state),
            activator: Mutex::new(None),
            results: AtomicU64::new(0),
            inbox,
            mailbox: Mutex::new(mailbox),
            launch,
        }))
    }

    /// The co-expression standing for a thread that is already running
    pub fn root() -> Self {
        Self::new("main", CoState::Running, None)
    }

    /// Co-expression whose first transmitted value becomes the argument of
    /// `method`; it is `&main` for everything created inside it
    pub fn entry(program: Arc<Program>, config: Arc<EngineConfig>, method: &str) -> Self {
        let launch = Launch {
            program,
            config,
            method: method.into(),
            args: None,
            main: None,
        };
        Self::new(method, CoState::Created, Some(launch))
    }

    /// Co-expression for `method(args)` in the program of `cx`
    pub fn create(cx: &Context, method: &str, args: Vec<Value>) -> Result<Self, EngineError> {
        if !cx.program().has_method(method) {
            return Err(EngineError::UnknownCallee(method.to_string()));
        }
        let launch = Launch {
            program: cx.program().clone(),
            config: cx.config().clone(),
            method: method.into(),
            args: Some(args),
            main: Some(cx.main().clone()),
        };
        Ok(Self::new(method, CoState::Created, Some(launch)))
    }

    /// A new co-expression in the created state for the same call
    pub fn refresh(&self) -> Result<Self, EngineError> {
        let launch = self
            .0
            .launch
            .clone()
            .ok_or_else(|| EngineError::host("refresh", "cannot refresh the main co-expression"))?;
        Ok(Self::new(&self.0.label, CoState::Created, Some(launch)))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn state(&self) -> CoState {
        *self.0.state.lock()
    }

    /// Number of results produced so far
    pub fn results(&self) -> u64 {
        self.0.results.load(Ordering::SeqCst)
    }

    /// The co-expression that most recently activated this one
    pub fn activator(&self) -> Option<CoExpression> {
        self.0
            .activator
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(CoExpression)
    }

    pub fn ptr_eq(&self, other: &CoExpression) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    fn set_state(&self, state: CoState) {
        *self.0.state.lock() = state;
    }

    /// Transfer control and `value` from the current co-expression of `cx` to
    /// `target`, blocking until control comes back.
    ///
    /// Returns the value transmitted back, or `None` when `target` terminated
    /// during this activation.
    pub fn activate(
        cx: &mut Context,
        target: &CoExpression,
        value: Value,
    ) -> Result<Option<Value>, EngineError> {
        let me = cx.current().clone();
        if target.ptr_eq(&me) {
            return Err(EngineError::CoexprRunning(target.id()));
        }
        let created = {
            let mut state = target.0.state.lock();
            match *state {
                CoState::Running => return Err(EngineError::CoexprRunning(target.id())),
                CoState::Terminated => return Err(EngineError::CoexprTerminated(target.id())),
                CoState::Created => {
                    *state = CoState::Running;
                    true
                }
                CoState::Suspended => {
                    *state = CoState::Running;
                    false
                }
            }
        };
        *target.0.activator.lock() = Some(Arc::downgrade(&me.0));
        me.set_state(CoState::Suspended);
        trace!(from = me.id(), to = target.id(), "activate");

        let sent = if created {
            target.spawn(value)
        } else {
            target.send(Transfer::Value(value))
        };
        if let Err(err) = sent {
            me.set_state(CoState::Running);
            target.set_state(CoState::Terminated);
            return Err(err);
        }

        match me.receive()? {
            Transfer::Value(value) => Ok(Some(value)),
            Transfer::Terminated => Ok(None),
            Transfer::Fault(err) => Err(err),
        }
    }

    fn send(&self, transfer: Transfer) -> Result<(), EngineError> {
        self.0
            .inbox
            .send(transfer)
            .map_err(|_| EngineError::ChannelClosed(format!("co-expression #{}", self.id())))
    }

    fn receive(&self) -> Result<Transfer, EngineError> {
        let transfer = self
            .0
            .mailbox
            .lock()
            .recv()
            .map_err(|_| EngineError::ChannelClosed(format!("co-expression #{}", self.id())))?;
        self.set_state(CoState::Running);
        Ok(transfer)
    }

    /// Return control to the activator
    fn hand_back(&self, transfer: Transfer) -> Result<(), EngineError> {
        let activator = self.activator().ok_or_else(|| {
            EngineError::ChannelClosed(format!("co-expression #{} has no activator", self.id()))
        })?;
        trace!(from = self.id(), to = activator.id(), "hand back");
        activator.send(transfer)
    }

    fn spawn(&self, first: Value) -> Result<(), EngineError> {
        let launch = self
            .0
            .launch
            .clone()
            .ok_or_else(|| EngineError::Spawn("the main co-expression has no body".to_string()))?;
        debug!(coexpr = self.id(), method = %launch.method, "spawning co-expression");
        let me = self.clone();
        thread::Builder::new()
            .name(format!("coexpr-{}", self.id()))
            .stack_size(launch.config.coexpr_stack_size)
            .spawn(move || me.run(launch, first))
            .map(|_| ())
            .map_err(|e| EngineError::Spawn(e.to_string()))
    }

    /// Thread entry point
    fn run(self, launch: Launch, first: Value) {
        let main = launch.main.clone().unwrap_or_else(|| self.clone());
        let mut cx = Context::for_coexpr(
            launch.program.clone(),
            launch.config.clone(),
            self.clone(),
            main,
        );
        let outcome = self.drive(&mut cx, &launch, first);
        self.set_state(CoState::Terminated);
        debug!(coexpr = self.id(), results = self.results(), "co-expression terminated");
        let transfer = match outcome {
            Ok(()) => Transfer::Terminated,
            Err(err) => Transfer::Fault(err),
        };
        if let Err(err) = self.hand_back(transfer) {
            warn!(coexpr = self.id(), error = %err, "lost co-expression result");
        }
    }

    fn drive(&self, cx: &mut Context, launch: &Launch, first: Value) -> Result<(), EngineError> {
        let args = launch.args.clone().unwrap_or_else(|| vec![first]);
        let mut body = cx.call(&launch.method, &args)?;
        while let Signal::Yield(atom) = body.advance(cx)? {
            self.0.results.fetch_add(1, Ordering::SeqCst);
            self.set_state(CoState::Suspended);
            self.hand_back(Transfer::Value(atom.deref()))?;
            self.receive()?;
        }
        cx.release(body);
        Ok(())
    }
}

impl fmt::Debug for CoExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "co-expression #{}({})", self.id(), self.label())
    }
}
