// src/signup/mod.rs
//! # Account registration
//! Best-effort sign-up against instances that run the stock registration form.
//!
//! Each instance goes through `Navigate → DetectForm → FillForm → ClassifyFlow
//! → Consent → Submit`. What the browser observed at each step is recorded in a
//! [`FormObservation`]; [`decide`] is a pure function that maps the observation to either the
//! next step to run or a terminal [`SignupOutcome`]. Absence of an element is an
//! ordinary `false` in the observation, never an error. Driver failures end the
//! instance with [`SignupOutcome::Error`].

pub mod confirm;
pub mod driver;

use std::time::Duration;

use tracing::{error, info, warn};

use crate::mailbox::Identity;
use crate::webdriver::WebDriverError;
use driver::{wait_for, FormDriver, Locator};

pub const USERNAME_FIELD: Locator = Locator::Name("user[account_attributes][username]");
pub const EMAIL_FIELD: Locator = Locator::Name("user[email]");
pub const PASSWORD_FIELD: Locator = Locator::Name("user[password]");
pub const PASSWORD_CONFIRMATION_FIELD: Locator = Locator::Name("user[password_confirmation]");
pub const INVITE_REQUEST_FIELD: Locator = Locator::Name("user[invite_request_attributes][text]");
pub const AGREEMENT_CHECKBOXES: [Locator; 2] = [
    Locator::Id("registration_user_agreement"),
    Locator::Id("user_agreement"),
];
pub const SUBMIT_BUTTON: Locator = Locator::Name("button");

/// Bounded waits used by the flow.
#[derive(Debug, Clone, Copy)]
pub struct SignupTimings {
    pub page_load: Duration,
    pub detect_form: Duration,
    pub field: Duration,
    pub before_submit: Duration,
    pub settle: Duration,
}

impl Default for SignupTimings {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(10),
            detect_form: Duration::from_secs(10),
            field: Duration::from_secs(5),
            before_submit: Duration::from_secs(2),
            settle: Duration::from_secs(5),
        }
    }
}

impl SignupTimings {
    /// No waiting at all; for tests and scripted drivers.
    pub fn immediate() -> Self {
        Self {
            page_load: Duration::ZERO,
            detect_form: Duration::ZERO,
            field: Duration::ZERO,
            before_submit: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unreachable,
    NoRegistrationForm,
    IncompleteForm,
    ApprovalRequired,
    NoConsentControl,
    NoSubmitControl,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::Unreachable => "unreachable",
            SkipReason::NoRegistrationForm => {
                "no standard registration form (private, closed, or custom sign-up page)"
            }
            SkipReason::IncompleteForm => "registration form is missing expected fields",
            SkipReason::ApprovalRequired => "approval required",
            SkipReason::NoConsentControl => "no user agreement checkbox found",
            SkipReason::NoSubmitControl => "no button found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// Form submitted; real success is only known after email confirmation.
    Registered,
    Skipped(SkipReason),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Navigate,
    DetectForm,
    FillForm,
    ClassifyFlow,
    Consent,
    Submit,
}

/// What has been observed so far. `None` means the step has not run yet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FormObservation {
    pub reachable: Option<bool>,
    pub form_present: Option<bool>,
    pub form_filled: Option<bool>,
    pub approval_required: Option<bool>,
    pub consent_given: Option<bool>,
    pub submitted: Option<bool>,
}

impl FormObservation {
    pub fn record(&mut self, step: Step, observed: bool) {
        let slot = match step {
            Step::Navigate => &mut self.reachable,
            Step::DetectForm => &mut self.form_present,
            Step::FillForm => &mut self.form_filled,
            Step::ClassifyFlow => &mut self.approval_required,
            Step::Consent => &mut self.consent_given,
            Step::Submit => &mut self.submitted,
        };
        *slot = Some(observed);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Observe(Step),
    Done(SignupOutcome),
}

/// Next step for `seen`, or the terminal outcome.
///
/// Approval-required instances stop before the consent checkbox is touched.
pub fn decide(seen: &FormObservation) -> Decision {
    use Decision::{Done, Observe};
    use SignupOutcome::Skipped;

    match seen.reachable {
        None => return Observe(Step::Navigate),
        Some(false) => return Done(Skipped(SkipReason::Unreachable)),
        Some(true) => {}
    }
    match seen.form_present {
        None => return Observe(Step::DetectForm),
        Some(false) => return Done(Skipped(SkipReason::NoRegistrationForm)),
        Some(true) => {}
    }
    match seen.form_filled {
        None => return Observe(Step::FillForm),
        Some(false) => return Done(Skipped(SkipReason::IncompleteForm)),
        Some(true) => {}
    }
    match seen.approval_required {
        None => return Observe(Step::ClassifyFlow),
        Some(true) => return Done(Skipped(SkipReason::ApprovalRequired)),
        Some(false) => {}
    }
    match seen.consent_given {
        None => return Observe(Step::Consent),
        Some(false) => return Done(Skipped(SkipReason::NoConsentControl)),
        Some(true) => {}
    }
    match seen.submitted {
        None => Observe(Step::Submit),
        Some(false) => Done(Skipped(SkipReason::NoSubmitControl)),
        Some(true) => Done(SignupOutcome::Registered),
    }
}

/// Run the registration flow for one instance. Never returns an error:
/// driver failures become [`SignupOutcome::Error`].
pub async fn register<D: FormDriver>(
    driver: &D,
    identity: &Identity,
    instance: &str,
    timings: &SignupTimings,
) -> SignupOutcome {
    let mut seen = FormObservation::default();
    loop {
        let step = match decide(&seen) {
            Decision::Done(outcome) => return outcome,
            Decision::Observe(step) => step,
        };

        let observed = match step {
            Step::Navigate => navigate(driver, instance).await,
            Step::DetectForm => wait_for(driver, USERNAME_FIELD, timings.detect_form)
                .await
                .map(|el| el.is_some()),
            Step::FillForm => fill_form(driver, identity, timings).await,
            Step::ClassifyFlow => driver
                .find_all(INVITE_REQUEST_FIELD)
                .await
                .map(|els| !els.is_empty()),
            Step::Consent => accept_agreement(driver, timings).await,
            Step::Submit => submit(driver, timings).await,
        };

        match observed {
            Ok(v) => seen.record(step, v),
            Err(e) => return SignupOutcome::Error(format!("{step:?}: {e}")),
        }
    }
}

async fn navigate<D: FormDriver>(driver: &D, instance: &str) -> Result<bool, WebDriverError> {
    match driver.goto(&format!("https://{instance}")).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_timeout() => Ok(false),
        Err(e) => Err(e),
    }
}

async fn fill_form<D: FormDriver>(
    driver: &D,
    identity: &Identity,
    timings: &SignupTimings,
) -> Result<bool, WebDriverError> {
    let Some(username) = wait_for(driver, USERNAME_FIELD, timings.field).await? else {
        return Ok(false);
    };
    driver.send_keys(&username, identity.username()).await?;

    let Some(email) = wait_for(driver, EMAIL_FIELD, timings.field).await? else {
        return Ok(false);
    };
    let email_text = identity.email();
    driver.send_keys(&email, &email_text).await?;

    let Some(password) = wait_for(driver, PASSWORD_FIELD, timings.field).await? else {
        return Ok(false);
    };
    driver.send_keys(&password, &identity.password).await?;

    // Some forms autofill the email once a password is typed; retype it.
    driver.clear(&email).await?;
    driver.send_keys(&email, &email_text).await?;

    let Some(confirmation) = wait_for(driver, PASSWORD_CONFIRMATION_FIELD, timings.field).await?
    else {
        return Ok(false);
    };
    driver.send_keys(&confirmation, &identity.password).await?;
    Ok(true)
}

async fn accept_agreement<D: FormDriver>(
    driver: &D,
    timings: &SignupTimings,
) -> Result<bool, WebDriverError> {
    for locator in AGREEMENT_CHECKBOXES {
        if let Some(checkbox) = wait_for(driver, locator, timings.field).await? {
            driver.click(&checkbox).await?;
            return Ok(true);
        }
    }
    Ok(false)
}

async fn submit<D: FormDriver>(driver: &D, timings: &SignupTimings) -> Result<bool, WebDriverError> {
    tokio::time::sleep(timings.before_submit).await;
    let Some(button) = driver.find_all(SUBMIT_BUTTON).await?.into_iter().next() else {
        return Ok(false);
    };
    driver.click(&button).await?;
    tokio::time::sleep(timings.settle).await;
    Ok(true)
}

/// Register on every instance in order; one instance's failure never stops the loop.
pub async fn register_all<D: FormDriver>(
    driver: &D,
    identity: &Identity,
    instances: &[String],
    timings: &SignupTimings,
) -> Vec<(String, SignupOutcome)> {
    let mut results = Vec::with_capacity(instances.len());
    for instance in instances {
        info!(instance = %instance, "attempting registration");
        let outcome = register(driver, identity, instance, timings).await;
        match &outcome {
            SignupOutcome::Registered => info!(instance = %instance, "registered successfully"),
            SignupOutcome::Skipped(SkipReason::NoSubmitControl) => {
                error!(instance = %instance, "no button found, skipping")
            }
            SignupOutcome::Skipped(reason) => {
                warn!(instance = %instance, reason = reason.describe(), "skipping instance")
            }
            SignupOutcome::Error(e) => {
                warn!(instance = %instance, error = %e, "registration failed, skipping")
            }
        }
        results.push((instance.clone(), outcome));
    }
    results
}
