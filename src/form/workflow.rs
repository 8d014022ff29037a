//! Submission of the configuration form
//!
//! validate -> persist endpoint -> provisioning exchange -> route

use super::{validate_draft, ConfigDraft, ValidationErrors};
use crate::provisioning::{ActivationInfo, ProvisioningClient, ProvisioningResult};
use crate::routing::{ProvisioningResultRouter, Route, RoutePublisher};
use crate::settings::{SessionConfig, SettingsStore};
use crate::utils::Observable;
use crate::{Result, VoicebotError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Status of the submission flow, shown next to the submit trigger
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmitStatus {
    #[default]
    Idle,
    /// Exchange in flight; the trigger must stay disabled
    Loading,
    Success(Route),
    Failed { message: String, retryable: bool },
}

impl SubmitStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, SubmitStatus::Loading)
    }
}

/// Releases the in-flight latch on every exit path
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SubmissionWorkflow {
    settings: Arc<dyn SettingsStore>,
    client: Arc<dyn ProvisioningClient>,
    router: ProvisioningResultRouter,
    status: Observable<SubmitStatus>,
    validation: Observable<ValidationErrors>,
    in_flight: AtomicBool,
}

impl SubmissionWorkflow {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        client: Arc<dyn ProvisioningClient>,
        routes: RoutePublisher,
    ) -> Self {
        Self {
            settings,
            client,
            router: ProvisioningResultRouter::new(routes),
            status: Observable::default(),
            validation: Observable::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> Observable<SubmitStatus> {
        self.status.clone()
    }

    /// Field errors of the last submission attempt
    pub fn validation(&self) -> Observable<ValidationErrors> {
        self.validation.clone()
    }

    /// Pairing code for the activation view
    pub fn activation(&self) -> Observable<Option<ActivationInfo>> {
        self.router.activation()
    }

    /// Whether the submit trigger should be enabled
    pub fn can_submit(&self) -> bool {
        !self.in_flight.load(Ordering::SeqCst)
    }

    /// Validate and submit a draft
    ///
    /// Validation failures and provisioning failures are returned to this
    /// caller only; neither publishes a route. A second submission while one
    /// is outstanding is rejected with `SubmissionInFlight`.
    pub async fn submit(&self, draft: &ConfigDraft) -> Result<Route> {
        let errors = validate_draft(draft);
        self.validation.set(errors.clone());
        if !errors.is_empty() {
            debug!("Submission rejected by validation: {}", errors);
            return Err(VoicebotError::Validation(errors));
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Submission ignored: another one is in flight");
            return Err(VoicebotError::SubmissionInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.status.set(SubmitStatus::Loading);
        let config = draft.to_session_config();

        match self.run(&config).await {
            Ok(route) => {
                self.status.set(SubmitStatus::Success(route));
                Ok(route)
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                self.status.set(SubmitStatus::Failed {
                    message: e.user_message(),
                    retryable: e.is_recoverable(),
                });
                Err(e)
            }
        }
    }

    async fn run(&self, config: &SessionConfig) -> Result<Route> {
        info!(
            "Submitting configuration: transport={}, endpoint={}",
            config.transport_kind, config.endpoint_url
        );
        self.settings.set_transport_kind(config.transport_kind)?;
        self.settings
            .set_endpoint_url(Some(config.endpoint_url.clone()))?;
        self.settings
            .set_provisioning_url(Some(config.provisioning_url.clone()))?;

        let outcome = self.client.check(config).await;

        // a completed exchange is still routed if only this write fails
        match self
            .settings
            .set_skip_config_after_connect(config.skip_config_after_connect)
        {
            Ok(()) => debug!(
                "Saved skip_config_after_connect: {}",
                config.skip_config_after_connect
            ),
            Err(e) => warn!("Failed to save skip_config_after_connect: {}", e),
        }

        let result = outcome?;
        if let ProvisioningResult::Activated { connection } = &result {
            self.settings
                .set_live_connection_config(Some(connection.clone()))?;
        }

        self.router
            .route(Some(result))
            .ok_or_else(|| VoicebotError::Channel("Route could not be published".into()))
    }
}
