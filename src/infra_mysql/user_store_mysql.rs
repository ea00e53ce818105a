use super::util::is_dup_key;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::types::Json;
use sqlx::{MySqlPool, Row};
use std::collections::HashMap;

const USER_COLUMNS: &str = "user_id, email, name, friends, requests";

/// User documents in a MySQL table, with `friends` and `requests` held as JSON
/// arrays. Each update locks the row and rewrites both arrays in one
/// transaction.
pub struct MySqlUserStore {
    pool: MySqlPool,
}

impl MySqlUserStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserStore { pool }
    }
}

fn backend(context: &str) -> impl Fn(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Backend(format!("{context}: {e}"))
}

fn user_from_row(row: &MySqlRow) -> Result<User, StoreError> {
    let decode = backend("decode user");
    let friends: Json<Vec<UserId>> = row.try_get("friends").map_err(&decode)?;
    let requests: Json<Vec<UserId>> = row.try_get("requests").map_err(&decode)?;

    Ok(User {
        id: row.try_get("user_id").map_err(&decode)?,
        email: row.try_get("email").map_err(&decode)?,
        name: row.try_get("name").map_err(&decode)?,
        friends: friends.0,
        requests: requests.0,
    })
}

#[async_trait::async_trait]
impl UserStore for MySqlUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = User::new(UserId::new_v4(), new_user);

        let res = sqlx::query(
            r#"
INSERT INTO user (user_id, email, name, friends, requests)
VALUES (?, ?, ?, JSON_ARRAY(), JSON_ARRAY())
"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(user),
            Err(e) if is_dup_key(&e) => Err(StoreError::Duplicate(user.email)),
            Err(e) => Err(StoreError::Backend(format!("insert user: {e}"))),
        }
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM user WHERE user_id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend("query user"))?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM user WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend("query user by email"))?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFoundByEmail(email.to_string())),
        }
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT {USER_COLUMNS} FROM user WHERE user_id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(backend("query users"))?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let user = user_from_row(row)?;
            by_id.insert(user.id, user);
        }

        // IN (...) does not preserve order
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    async fn update_by_id(&self, id: UserId, updates: &[UserUpdate]) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend("begin"))?;

        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE user_id = ? FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend("lock user"))?;

        let Some(row) = row else {
            return Err(StoreError::NotFound(id));
        };
        let mut user = user_from_row(&row)?;

        let changed = updates
            .iter()
            .fold(false, |changed, update| update.apply(&mut user) || changed);

        if changed {
            sqlx::query("UPDATE user SET friends = ?, requests = ? WHERE user_id = ?")
                .bind(Json(&user.friends))
                .bind(Json(&user.requests))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(backend("update user"))?;
        }

        tx.commit().await.map_err(backend("commit"))?;
        Ok(user)
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, StoreError> {
        sqlx::query_scalar::<_, UserId>("SELECT user_id FROM user")
            .fetch_all(&self.pool)
            .await
            .map_err(backend("list users"))
    }
}
