use crate::api::{backend_from_settings, ApiClient, Backend};
use crate::basket::BasketManager;
use crate::config::{Settings, StorageKind};
use crate::models::{Credentials, NewOrder, Order, ShippingAddress};
use crate::notifications::NotificationCenter;
use crate::router::{guard_navigation, redirect_for_session_expiry, Navigation, Redirect, Route};
use crate::services::{metrics, Services};
use crate::session::{Session, SessionContext, SessionEvent};
use crate::storage::{DirectoryStorage, MemoryStorage, Storage};
use mybooks_core::ApiError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Everything a front end needs, wired once and shared.
#[derive(Clone)]
pub struct MyBooks {
    api: ApiClient,
    pub services: Arc<Services>,
    pub basket: Arc<BasketManager>,
    pub notifications: Arc<NotificationCenter>,
    navigation: NavigationState,
}

/// Route bookkeeping shared with the session watcher. Holds no session
/// handle, so the watcher ends once every `MyBooks` clone is dropped.
#[derive(Clone)]
struct NavigationState {
    notifications: Arc<NotificationCenter>,
    current_route: Arc<Mutex<Route>>,
    pending_redirect: Arc<Mutex<Option<Redirect>>>,
}

impl NavigationState {
    fn current_route(&self) -> Route {
        lock(&self.current_route).clone()
    }

    fn on_session_event(&self, event: &SessionEvent) -> Option<Redirect> {
        match event {
            SessionEvent::Expired => {
                self.notifications
                    .warning("Votre session a expiré. Veuillez vous reconnecter.");
                let redirect = redirect_for_session_expiry(&self.current_route())?;
                *lock(&self.pending_redirect) = Some(redirect.clone());
                Some(redirect)
            }
            SessionEvent::LoggedIn(user) => {
                self.notifications
                    .success(format!("Bienvenue, {} !", user.display_name()));
                None
            }
            SessionEvent::LoggedOut | SessionEvent::ProfileUpdated(_) => None,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MyBooks {
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!("Failed to register client metrics: {}", e);
        }

        let storage: Arc<dyn Storage> = match settings.storage.kind {
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
            StorageKind::Directory => Arc::new(DirectoryStorage::new(settings.storage.directory.clone())?),
        };
        let backend = backend_from_settings(settings)?;

        tracing::info!(
            backend = backend.name(),
            storage = ?settings.storage.kind,
            "MyBooks client configured"
        );
        Ok(Self::new(backend, storage))
    }

    pub fn new(backend: Arc<dyn Backend>, storage: Arc<dyn Storage>) -> Self {
        let session = SessionContext::new(storage.clone());
        let api = ApiClient::new(backend, session);

        let notifications = Arc::new(NotificationCenter::new());

        Self {
            services: Arc::new(Services::new(api.clone())),
            basket: Arc::new(BasketManager::new(api.clone(), storage)),
            navigation: NavigationState {
                notifications: notifications.clone(),
                current_route: Arc::new(Mutex::new(Route::resolve("/"))),
                pending_redirect: Arc::new(Mutex::new(None)),
            },
            notifications,
            api,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionContext {
        self.api.session()
    }

    /// Restore the session, load the local basket and, when logged in,
    /// merge in the basket saved on the backend.
    pub async fn init(&self) {
        let user = self.services.auth.restore();
        self.basket.initialize().await;

        if user.is_some() {
            if let Err(e) = self.basket.load_saved_basket().await {
                tracing::warn!(kind = e.kind(), "Could not load saved basket: {}", e);
                self.notifications.report_error(&e);
            }
        }
    }

    /// Log in, then merge the saved basket. A failed merge does not undo the
    /// login. Failures of either step are also posted as notifications.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let session = match self.services.auth.login(credentials).await {
            Ok(session) => session,
            Err(e) => {
                match &e {
                    // Rejected credentials, not an expired session
                    ApiError::Auth(message) => self.notifications.error(message.clone()),
                    other => self.notifications.report_error(other),
                };
                return Err(e);
            }
        };

        if let Err(e) = self.basket.load_saved_basket().await {
            tracing::warn!(kind = e.kind(), "Could not load saved basket after login: {}", e);
            self.notifications.report_error(&e);
        }
        Ok(session)
    }

    pub fn logout(&self) {
        self.services.auth.logout();
    }

    /// Place an order for the current basket contents and empty the basket.
    pub async fn checkout(
        &self,
        promo_code: Option<String>,
        shipping_address: Option<ShippingAddress>,
    ) -> Result<Order, ApiError> {
        if !self.session().is_authenticated() {
            let e = ApiError::Auth("login required to place an order".to_string());
            self.notifications.report_error(&e);
            return Err(e);
        }
        if self.basket.verify_stock().await {
            self.notifications
                .warning("Votre panier a été ajusté au stock disponible.");
            return Err(ApiError::invalid(
                "items",
                "stock_changed",
                "Basket was adjusted to current stock, review it before ordering",
            ));
        }

        let order = NewOrder {
            items: self.basket.snapshot().order_lines(),
            promo_code: promo_code
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            shipping_address,
        };
        let placed = match self.services.orders.create(&order).await {
            Ok(placed) => placed,
            Err(e) => {
                tracing::warn!(kind = e.kind(), "Order was not placed: {}", e);
                self.notifications.report_error(&e);
                return Err(e);
            }
        };

        if let Err(e) = self.basket.clear().await {
            tracing::warn!(order_id = placed.id, "Order placed but basket not cleared: {}", e);
        }
        Ok(placed)
    }

    /// Run the guards for `full_path` and remember the route when
    /// navigation proceeds.
    pub async fn navigate(&self, full_path: &str) -> (Route, Navigation) {
        let (route, navigation) = guard_navigation(&self.services.auth, full_path).await;
        if navigation.is_proceed() {
            *lock(&self.navigation.current_route) = route.clone();
        }
        (route, navigation)
    }

    pub fn current_route(&self) -> Route {
        self.navigation.current_route()
    }

    /// React to a session change. An expiry notifies the visitor and queues
    /// a redirect to the login page.
    pub fn handle_session_event(&self, event: &SessionEvent) -> Option<Redirect> {
        self.navigation.on_session_event(event)
    }

    /// Redirect queued by a session expiry, if the UI has not taken it yet.
    pub fn take_pending_redirect(&self) -> Option<Redirect> {
        lock(&self.navigation.pending_redirect).take()
    }

    /// Feed session events to [`MyBooks::handle_session_event`] in the
    /// background.
    pub fn watch_session(&self) -> JoinHandle<()> {
        let navigation = self.navigation.clone();
        let mut events = self.session().subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        navigation.on_session_event(&event);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Session watcher fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(storage: serde_json::Value) -> Settings {
        serde_json::from_value(serde_json::json!({
            "api": { "base_url": "http://unused" },
            "backend": "fixture",
            "storage": storage,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn builds_from_settings_with_directory_storage() {
        let dir = tempfile::tempdir().unwrap();
        let app = MyBooks::from_settings(&settings(serde_json::json!({
            "kind": "directory",
            "directory": dir.path().join("state"),
        })))
        .unwrap();

        assert_eq!(app.api().backend_name(), "fixture");
        assert!(dir.path().join("state").is_dir());
        app.init().await;
        assert!(!app.session().is_authenticated());
    }

    #[test]
    fn logged_in_event_greets_the_user() {
        let app = MyBooks::from_settings(&settings(serde_json::json!({ "kind": "memory" }))).unwrap();
        let user = crate::session::tests::sample_user("USER");

        assert!(app.handle_session_event(&SessionEvent::LoggedIn(user)).is_none());
        let active = app.notifications.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "Bienvenue, reader !");
    }

    #[test]
    fn expiry_on_login_page_only_notifies() {
        let app = MyBooks::from_settings(&settings(serde_json::json!({ "kind": "memory" }))).unwrap();
        *lock(&app.navigation.current_route) = Route::resolve("/login");

        assert!(app.handle_session_event(&SessionEvent::Expired).is_none());
        assert!(app.take_pending_redirect().is_none());
        assert_eq!(app.notifications.active().len(), 1);
    }
}
