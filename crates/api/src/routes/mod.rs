pub mod billing;
pub mod bookings;
pub mod completion;
pub mod documents;
pub mod forms;
pub mod health;
pub mod notes;
pub mod therapists;
pub mod users;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /users/me                                        current user (auth)
/// /users/me/role                                   choose role before onboarding
/// /users/me/onboarding                             finish onboarding
///
/// /therapists                                      list, create profile
/// /therapists/me                                   own profile get, update
/// /therapists/me/payments/connect                  start payout onboarding
/// /therapists/me/payments/refresh                  new onboarding link
/// /therapists/me/payments                          disconnect payouts (DELETE)
/// /therapists/me/calendar/connect                  exchange OAuth code
/// /therapists/me/calendar                          disconnect calendar (DELETE)
/// /therapists/me/availability                      replace weekly windows (PUT)
/// /therapists/{id}                                 public profile
/// /therapists/{id}/availability                    weekly windows
/// /therapists/{id}/slots                           bookable slots in a range
///
/// /bookings                                        list, create
/// /bookings/{id}                                   get
/// /bookings/{id}/confirm                           therapist confirms
/// /bookings/{id}/cancel                            participant cancels
///
/// /cron/complete-sessions                          completion batch (bearer secret)
/// /admin/sessions/complete                         completion batch (employer admin)
///
/// /billing/customer                                create payment customer
/// /billing/sync                                    refresh subscription from processor
/// /billing/subscription                            cached subscription snapshot
///
/// /webhooks/identity                               identity provider events
/// /webhooks/scheduling                             scheduling widget callbacks
/// /webhooks/payments                               payment processor events
///
/// /documents                                       list, register upload
/// /documents/{id}                                  get with download URL, delete
///
/// /intake-forms                                    list, create
/// /intake-forms/{id}                               get, update, deactivate
///
/// /client-notes                                    list, create
/// /client-notes/{id}                               get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/therapists", therapists::router())
        .nest("/bookings", bookings::router())
        // Completion triggers live under two prefixes with different auth.
        .merge(completion::router())
        .nest("/billing", billing::router())
        .nest("/webhooks", webhooks::router())
        .nest("/documents", documents::router())
        .nest("/intake-forms", forms::router())
        .nest("/client-notes", notes::router())
}
