use crate::binder::ParamDescriptor;
use crate::controller::{Controller, HandlerTable, RouteEntry};
use crate::response::ResponseEntity;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default)]
struct UserStore {
    users: BTreeMap<i64, User>,
    next_id: i64,
}

/// In-memory users resource under `/api/v1/users`.
///
/// | Method | Path | Handler |
/// |---|---|---|
/// | GET | `/` | `List` |
/// | GET | `/{id}` | `Get` |
/// | POST | `/` | `Post` |
/// | PUT | `/{id}` | `Put` |
/// | DELETE | `/{id}` | `Delete` |
#[derive(Clone, Default)]
pub struct UsersController {
    store: Arc<RwLock<UserStore>>,
}

impl UsersController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `users` already stored. Later ids continue after the
    /// highest seeded id.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let mut store = UserStore::default();
        for user in users {
            store.next_id = store.next_id.max(user.id);
            store.users.insert(user.id, user);
        }
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        read(&self.store).map(|s| s.users.len()).unwrap_or_default()
    }
}

fn read(store: &RwLock<UserStore>) -> anyhow::Result<RwLockReadGuard<'_, UserStore>> {
    store.read().map_err(|_| anyhow!("user store lock poisoned"))
}

fn write(store: &RwLock<UserStore>) -> anyhow::Result<RwLockWriteGuard<'_, UserStore>> {
    store.write().map_err(|_| anyhow!("user store lock poisoned"))
}

fn user_not_found() -> ResponseEntity {
    ResponseEntity::not_found("User not found")
}

impl Controller for UsersController {
    fn name(&self) -> &str {
        "users"
    }

    fn base_path(&self) -> &str {
        "/api/v1/users"
    }

    fn routes(&self) -> Vec<RouteEntry> {
        vec![
            RouteEntry::get("/", "List"),
            RouteEntry::get("/{id}", "Get"),
            RouteEntry::post("/", "Post"),
            RouteEntry::put("/{id}", "Put"),
            RouteEntry::delete("/{id}", "Delete"),
        ]
    }

    fn handlers(&self) -> HandlerTable {
        let list_store = Arc::clone(&self.store);
        let get_store = Arc::clone(&self.store);
        let post_store = Arc::clone(&self.store);
        let put_store = Arc::clone(&self.store);
        let delete_store = Arc::clone(&self.store);

        HandlerTable::new()
            .handler("List", [], move |_| {
                let store = read(&list_store)?;
                let users: Vec<&User> = store.users.values().collect();
                Ok(ResponseEntity::ok().json_body(&users)?)
            })
            .handler("Get", [ParamDescriptor::int("id")], move |inv| {
                let id = inv.args.int(0)?;
                let store = read(&get_store)?;
                match store.users.get(&id) {
                    Some(user) => Ok(ResponseEntity::ok().json_body(user)?),
                    None => Ok(user_not_found()),
                }
            })
            .handler(
                "Post",
                [ParamDescriptor::record::<CreateUserRequest>()],
                move |inv| {
                    let req: CreateUserRequest = inv.args.take_record(0)?;
                    if req.name.is_empty() || req.email.is_empty() {
                        return Ok(ResponseEntity::bad_request("Name and Email are required"));
                    }
                    let mut store = write(&post_store)?;
                    store.next_id += 1;
                    let user = User {
                        id: store.next_id,
                        name: req.name,
                        email: req.email,
                    };
                    info!(user_id = user.id, "User created");
                    let entity = ResponseEntity::created()
                        .header("Location", format!("/api/v1/users/{}", user.id))
                        .json_body(&user)?;
                    store.users.insert(user.id, user);
                    Ok(entity)
                },
            )
            .handler(
                "Put",
                [
                    ParamDescriptor::int("id"),
                    ParamDescriptor::record::<UpdateUserRequest>(),
                ],
                move |inv| {
                    let id = inv.args.int(0)?;
                    let req: UpdateUserRequest = inv.args.take_record(1)?;
                    let mut store = write(&put_store)?;
                    let Some(user) = store.users.get_mut(&id) else {
                        return Ok(user_not_found());
                    };
                    if let Some(name) = req.name {
                        user.name = name;
                    }
                    if let Some(email) = req.email {
                        user.email = email;
                    }
                    Ok(ResponseEntity::ok().json_body(&*user)?)
                },
            )
            .handler("Delete", [ParamDescriptor::int("id")], move |inv| {
                let id = inv.args.int(0)?;
                let mut store = write(&delete_store)?;
                match store.users.remove(&id) {
                    Some(_) => {
                        info!(user_id = id, "User deleted");
                        Ok(ResponseEntity::no_content())
                    }
                    None => Ok(user_not_found()),
                }
            })
    }
}
