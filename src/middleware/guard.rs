// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-page route guard driven by the session state.

use tokio::sync::watch;

use crate::models::Session;
use crate::routes::{Area, ADMIN_DASHBOARD, ADMIN_LOGIN, DASHBOARD, LOGIN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading; render nothing and wait.
    Pending,
    Allow,
    Redirect(&'static str),
}

/// Decide what to do with a navigation to `area` given `session`.
pub fn evaluate(area: Area, session: &Session) -> GuardDecision {
    if session.is_loading() {
        return GuardDecision::Pending;
    }

    let authenticated = session.is_authenticated();
    let admin = session.is_admin();

    match area {
        Area::Public => GuardDecision::Allow,
        Area::User if !authenticated => GuardDecision::Redirect(LOGIN),
        Area::User => GuardDecision::Allow,
        Area::Admin if !authenticated => GuardDecision::Redirect(ADMIN_LOGIN),
        Area::Admin if !admin => GuardDecision::Redirect(DASHBOARD),
        Area::Admin => GuardDecision::Allow,
        Area::AdminIndex if admin => GuardDecision::Redirect(ADMIN_DASHBOARD),
        Area::AdminIndex => GuardDecision::Redirect(ADMIN_LOGIN),
        Area::Guest if authenticated => GuardDecision::Redirect(DASHBOARD),
        Area::Guest => GuardDecision::Allow,
        Area::AdminGuest if admin => GuardDecision::Redirect(ADMIN_DASHBOARD),
        Area::AdminGuest if authenticated => GuardDecision::Redirect(DASHBOARD),
        Area::AdminGuest => GuardDecision::Allow,
    }
}

/// Wait until the session stops loading, then evaluate.
///
/// If the session store goes away while loading, the last seen state is
/// evaluated as if loading had finished.
pub async fn wait_for_decision(
    mut sessions: watch::Receiver<Session>,
    area: Area,
) -> GuardDecision {
    let settled = sessions
        .wait_for(|s| !s.is_loading())
        .await
        .map(|session| (*session).clone());
    let session = match settled {
        Ok(session) => session,
        Err(_) => sessions.borrow().clone().with_loading(false),
    };
    evaluate(area, &session)
}
