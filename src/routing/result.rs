use super::{Route, RoutePublisher};
use crate::provisioning::{ActivationInfo, ProvisioningResult};
use crate::utils::Observable;
use tracing::{info, warn};

/// Turns a completed provisioning exchange into one navigation decision
///
/// `route` takes the result by value, so the same result can never be routed
/// twice.
pub struct ProvisioningResultRouter {
    routes: RoutePublisher,
    activation: Observable<Option<ActivationInfo>>,
}

impl ProvisioningResultRouter {
    pub fn new(routes: RoutePublisher) -> Self {
        Self {
            routes,
            activation: Observable::new(None),
        }
    }

    /// Activation info for the activation view. Only `Some` after a
    /// `PendingActivation` result, cleared by an `Activated` one.
    pub fn activation(&self) -> Observable<Option<ActivationInfo>> {
        self.activation.clone()
    }

    /// Publish the route for `result`. `None` (nothing submitted yet)
    /// publishes nothing.
    pub fn route(&self, result: Option<ProvisioningResult>) -> Option<Route> {
        let route = match result? {
            ProvisioningResult::Activated { .. } => {
                self.activation.set(None);
                Route::Chat
            }
            ProvisioningResult::PendingActivation { activation } => {
                info!("Activation required, code {}", activation.code);
                self.activation.set(Some(activation));
                Route::Activation
            }
        };

        if let Err(e) = self.routes.publish(route) {
            warn!("{}", e);
            return None;
        }
        Some(route)
    }
}
