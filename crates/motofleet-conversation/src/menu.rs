// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role- and fleet-scoped menus.
//!
//! Menus are rebuilt on every call and never cached, so role and fleet
//! changes show up on the very next message.

use std::sync::Arc;
use std::time::Duration;

use motofleet_core::{
    FleetDirectory, FleetError, MenuAction, Motorcycle, MotorcycleQuery, User, UserDirectory,
    UserRole,
};

use crate::response::format_number;

/// Motorcycles shown per page of the selection menu (keys `1`-`9`).
pub const MOTORCYCLE_PAGE_SIZE: usize = 9;

/// Key of the "show more" option on paged motorcycle menus.
pub const SHOW_MORE_KEY: &str = "0";

pub const MAIN_MENU_ID: &str = "main";
pub const MOTORCYCLE_MENU_ID: &str = "motorcycle_selection";
pub const EMPTY_MOTORCYCLE_MENU_ID: &str = "no_motorcycles";

/// One selectable line of a [`Menu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub action: MenuAction,
}

impl MenuOption {
    fn new(key: impl Into<String>, label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            description: None,
            enabled: true,
            action,
        }
    }

    fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An ephemeral list of options presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub id: String,
    pub title: String,
    pub options: Vec<MenuOption>,
    pub footer: Option<String>,
    /// Whether the back word returns to the main menu.
    pub allow_back: bool,
    pub timeout_hint: Option<Duration>,
    /// Effective page for paged menus, after wrap-around.
    pub page: u32,
}

impl Menu {
    /// The enabled option whose key equals `key` exactly.
    pub fn find_enabled(&self, key: &str) -> Option<&MenuOption> {
        self.options.iter().find(|o| o.enabled && o.key == key)
    }
}

/// Narrows the motorcycle selection menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotorcycleFilter {
    /// Client scope for administrators. Ignored for other roles.
    pub client_id: Option<String>,
    /// Requested page. Wraps around past the last page.
    pub page: u32,
}

impl MotorcycleFilter {
    pub fn page(page: u32) -> Self {
        Self {
            client_id: None,
            page,
        }
    }
}

/// Builds menus from the user and fleet directories.
pub struct MenuBuilder {
    users: Arc<dyn UserDirectory>,
    fleet: Arc<dyn FleetDirectory>,
    timeout_hint: Option<Duration>,
}

impl MenuBuilder {
    pub fn new(users: Arc<dyn UserDirectory>, fleet: Arc<dyn FleetDirectory>) -> Self {
        Self {
            users,
            fleet,
            timeout_hint: None,
        }
    }

    /// Idle timeout announced under the main menu.
    pub fn with_timeout_hint(mut self, hint: Duration) -> Self {
        self.timeout_hint = Some(hint);
        self
    }

    async fn lookup(&self, user_id: &str) -> Result<User, FleetError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| FleetError::not_found("user", user_id))
    }

    /// Main menu. The admin entry is added for privileged roles only, and
    /// "end conversation" always takes the last key.
    pub async fn build_main_menu(&self, user_id: &str) -> Result<Menu, FleetError> {
        let user = self.lookup(user_id).await?;

        let mut actions = vec![
            (MenuAction::ReportMileage, "דיווח קילומטראז'"),
            (MenuAction::ViewMaintenance, "צפייה בסטטוס טיפולים"),
        ];
        if user.role.is_admin() {
            actions.push((MenuAction::AdminActions, "פעולות מנהל"));
        }
        actions.push((MenuAction::EndConversation, "סיום שיחה"));

        let options = actions
            .into_iter()
            .enumerate()
            .map(|(i, (action, label))| MenuOption::new((i + 1).to_string(), label, action))
            .collect();

        Ok(Menu {
            id: MAIN_MENU_ID.to_string(),
            title: "מה תרצה לעשות?".to_string(),
            options,
            footer: Some("השב עם מספר האפשרות".to_string()),
            allow_back: false,
            timeout_hint: self.timeout_hint,
            page: 0,
        })
    }

    /// Motorcycles visible to the user, nine per page.
    ///
    /// Couriers see their assigned motorcycles, client users their client's,
    /// administrators everything or `filter.client_id`.
    pub async fn build_motorcycle_selection_menu(
        &self,
        user_id: &str,
        filter: &MotorcycleFilter,
    ) -> Result<Menu, FleetError> {
        let user = self.lookup(user_id).await?;
        let Some(query) = visibility(&user, filter) else {
            return Ok(empty_motorcycle_menu());
        };
        let motorcycles = self.fleet.list_motorcycles(&query).await?;
        if motorcycles.is_empty() {
            return Ok(empty_motorcycle_menu());
        }
        Ok(motorcycle_page(&motorcycles, filter.page))
    }
}

/// Query scoping the fleet to what `user` may see. `None` sees nothing.
fn visibility(user: &User, filter: &MotorcycleFilter) -> Option<MotorcycleQuery> {
    match user.role {
        UserRole::Admin => Some(MotorcycleQuery {
            assigned_courier_id: None,
            client_id: filter.client_id.clone(),
        }),
        UserRole::Courier => Some(MotorcycleQuery::for_courier(&user.id)),
        UserRole::Client => user.client_id.as_deref().map(MotorcycleQuery::for_client),
    }
}

fn motorcycle_page(motorcycles: &[Motorcycle], requested: u32) -> Menu {
    let total = motorcycles.len();
    let pages = total.div_ceil(MOTORCYCLE_PAGE_SIZE);
    let page = requested as usize % pages;
    let start = page * MOTORCYCLE_PAGE_SIZE;
    let end = (start + MOTORCYCLE_PAGE_SIZE).min(total);

    let mut options: Vec<MenuOption> = motorcycles[start..end]
        .iter()
        .enumerate()
        .map(|(i, m)| {
            MenuOption::new(
                (i + 1).to_string(),
                format!("{} {}", m.license_plate, m.model).trim_end().to_string(),
                MenuAction::SelectMotorcycle {
                    motorcycle_id: m.id.clone(),
                },
            )
            .with_description(format!("{} ק\"מ", format_number(i64::from(m.current_mileage))))
        })
        .collect();

    let footer = if pages > 1 {
        options.push(MenuOption::new(SHOW_MORE_KEY, "הצג עוד", MenuAction::ShowMore));
        Some(format!("מציג {}-{} מתוך {}", start + 1, end, total))
    } else {
        None
    };

    Menu {
        id: MOTORCYCLE_MENU_ID.to_string(),
        title: "בחר אופנוע:".to_string(),
        options,
        footer,
        allow_back: true,
        timeout_hint: None,
        page: page as u32,
    }
}

fn empty_motorcycle_menu() -> Menu {
    Menu {
        id: EMPTY_MOTORCYCLE_MENU_ID.to_string(),
        title: "לא נמצאו אופנועים המשויכים אליך.".to_string(),
        options: vec![MenuOption::new(
            "1",
            "חזרה לתפריט הראשי",
            MenuAction::BackToMain,
        )],
        footer: None,
        allow_back: true,
        timeout_hint: None,
        page: 0,
    }
}
