//! Navigation decisions
//!
//! Routes are published onto a queue with exactly one consumer, the
//! presentation layer's screen host. The queue is unbounded so a decision
//! made while no screen is attached is held until one drains it.

mod result;
mod startup;

pub use result::ProvisioningResultRouter;
pub use startup::initial_route;

use crate::{Result, VoicebotError};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A destination screen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Form,
    Activation,
    Chat,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Form => "form",
            Route::Activation => "activation",
            Route::Chat => "chat",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "form" => Some(Route::Form),
            "activation" => Some(Route::Activation),
            "chat" => Some(Route::Chat),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of the route queue
pub struct NavigationRouter {
    tx: Sender<Route>,
    rx: Mutex<Option<Receiver<Route>>>,
}

impl NavigationRouter {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    pub fn publisher(&self) -> RoutePublisher {
        RoutePublisher {
            tx: self.tx.clone(),
        }
    }

    /// Hand out the single consumer end. Returns `None` once taken.
    pub fn take_receiver(&self) -> Option<RouteReceiver> {
        self.rx.lock().take().map(|rx| RouteReceiver { rx })
    }
}

impl Default for NavigationRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable publishing end of the route queue
#[derive(Clone)]
pub struct RoutePublisher {
    tx: Sender<Route>,
}

impl RoutePublisher {
    pub fn publish(&self, route: Route) -> Result<()> {
        debug!("Navigation requested: {}", route);
        self.tx
            .send(route)
            .map_err(|e| VoicebotError::Channel(format!("Failed to publish route: {}", e)))
    }
}

/// The one consumer of the route queue. Each route is yielded exactly once.
pub struct RouteReceiver {
    rx: Receiver<Route>,
}

impl RouteReceiver {
    /// Try to receive a route (non-blocking)
    pub fn try_recv(&self) -> Option<Route> {
        match self.rx.try_recv() {
            Ok(route) => Some(route),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Receive a route, waiting up to `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Route> {
        match self.rx.recv_timeout(timeout) {
            Ok(route) => Some(route),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drain all pending routes in publication order
    pub fn drain(&self) -> Vec<Route> {
        self.rx.try_iter().collect()
    }
}
