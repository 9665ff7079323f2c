use sqlx::Row;

use wireline_core::canonical_pair;

use super::super::auth::service::find_user_by_username;
use super::super::config::{MAX_SEARCH_RESULTS, MIN_SEARCH_QUERY_CHARS};
use super::super::errors::AppError;
use super::super::state::{AppState, FriendRequestRecord, FriendRequestStatus, UserRecord};

pub async fn are_friends(state: &AppState, user_a: &str, user_b: &str) -> bool {
    let (user1, user2) = canonical_pair(user_a, user_b);
    if let Some(pool) = &state.db_pool {
        return sqlx::query("SELECT 1 FROM friendships WHERE user1 = $1 AND user2 = $2")
            .bind(&user1)
            .bind(&user2)
            .fetch_optional(pool)
            .await
            .ok()
            .flatten()
            .is_some();
    }
    state.friendships.read().await.contains(&(user1, user2))
}

/// Users whose username contains `query` (case-insensitive), excluding
/// `self_username`, existing friends, and anyone `self_username` has already
/// sent a request to (any status, including rejected).
pub async fn search(
    state: &AppState,
    query: &str,
    self_username: &str,
) -> Result<Vec<UserRecord>, AppError> {
    if query.chars().count() < MIN_SEARCH_QUERY_CHARS {
        return Err(AppError::Validation(vec![format!(
            "query must be at least {MIN_SEARCH_QUERY_CHARS} characters"
        )]));
    }
    let needle = query.to_lowercase();

    let excluded = excluded_usernames(state, self_username).await;

    if let Some(pool) = &state.db_pool {
        let pattern = format!("%{needle}%");
        let rows = sqlx::query(
            "SELECT username, display_name, email, hashed_password, last_seen, created_at,
                    hashed_refresh_token, refresh_token_expires_at
             FROM users
             WHERE LOWER(username) LIKE $1 AND username <> $2
             ORDER BY username
             LIMIT $3",
        )
        .bind(&pattern)
        .bind(self_username)
        .bind(MAX_SEARCH_RESULTS as i64 + excluded.len() as i64)
        .fetch_all(pool)
        .await?;
        let users = rows
            .into_iter()
            .map(|row| UserRecord {
                username: row.get("username"),
                display_name: row.get("display_name"),
                email: row.get("email"),
                hashed_password: row.get("hashed_password"),
                last_seen: row.get("last_seen"),
                created_at: row.get("created_at"),
                hashed_refresh_token: row.get("hashed_refresh_token"),
                refresh_token_expires_at: row.get("refresh_token_expires_at"),
            })
            .filter(|user| !excluded.contains(&user.username))
            .take(MAX_SEARCH_RESULTS)
            .collect();
        return Ok(users);
    }

    let users = state.users.read().await;
    let mut matches: Vec<UserRecord> = users
        .values()
        .filter(|user| user.username != self_username)
        .filter(|user| !excluded.contains(&user.username))
        .filter(|user| user.username.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    matches.sort_by(|a, b| a.username.cmp(&b.username));
    matches.truncate(MAX_SEARCH_RESULTS);
    Ok(matches)
}

async fn excluded_usernames(state: &AppState, self_username: &str) -> std::collections::HashSet<String> {
    let mut excluded = std::collections::HashSet::new();

    if let Some(pool) = &state.db_pool {
        if let Ok(rows) = sqlx::query(
            "SELECT recipient_username FROM friend_requests WHERE sender_username = $1",
        )
        .bind(self_username)
        .fetch_all(pool)
        .await
        {
            for row in rows {
                let recipient: String = row.get("recipient_username");
                excluded.insert(recipient);
            }
        }
        if let Ok(rows) = sqlx::query("SELECT user1, user2 FROM friendships WHERE user1 = $1 OR user2 = $1")
            .bind(self_username)
            .fetch_all(pool)
            .await
        {
            for row in rows {
                let user1: String = row.get("user1");
                let user2: String = row.get("user2");
                excluded.insert(if user1 == self_username { user2 } else { user1 });
            }
        }
        return excluded;
    }

    for request in state.friend_requests.read().await.values() {
        if request.sender_username == self_username {
            excluded.insert(request.recipient_username.clone());
        }
    }
    for (user1, user2) in state.friendships.read().await.iter() {
        if user1 == self_username {
            excluded.insert(user2.clone());
        } else if user2 == self_username {
            excluded.insert(user1.clone());
        }
    }
    excluded
}

pub struct SendRequestOutcome {
    pub id: String,
    pub sender_username: String,
    pub recipient_username: String,
    pub status: FriendRequestStatus,
}

/// Implements the tiered send-request algorithm:
/// 1. reject self-requests
/// 2. require the recipient to exist
/// 3. reject if already friends
/// 4. reject if sender already has a pending/accepted/rejected request to recipient
/// 5. auto-accept if recipient already has a PENDING request to sender
/// 6. otherwise persist a new PENDING request
pub async fn send_request(
    state: &AppState,
    sender: &str,
    recipient: &str,
) -> Result<SendRequestOutcome, AppError> {
    if sender == recipient {
        return Err(AppError::CannotFriendSelf);
    }
    if find_user_by_username(state, recipient).await.is_none() {
        return Err(AppError::UserNotFound);
    }
    if are_friends(state, sender, recipient).await {
        return Err(AppError::FriendshipAlreadyExists);
    }

    if let Some(pool) = &state.db_pool {
        let forward = sqlx::query(
            "SELECT 1 FROM friend_requests WHERE sender_username = $1 AND recipient_username = $2",
        )
        .bind(sender)
        .bind(recipient)
        .fetch_optional(pool)
        .await?;
        if forward.is_some() {
            return Err(AppError::FriendRequestAlreadyExists);
        }

        let reverse_pending = sqlx::query(
            "SELECT id FROM friend_requests
             WHERE sender_username = $1 AND recipient_username = $2 AND status = 'pending'",
        )
        .bind(recipient)
        .bind(sender)
        .fetch_optional(pool)
        .await?;

        let now = chrono::Utc::now();
        let mut tx = pool.begin().await?;
        if let Some(reverse) = reverse_pending {
            let reverse_id: String = reverse.get("id");
            sqlx::query("DELETE FROM friend_requests WHERE id = $1")
                .bind(&reverse_id)
                .execute(&mut *tx)
                .await?;
            let (user1, user2) = canonical_pair(sender, recipient);
            sqlx::query(
                "INSERT INTO friendships (user1, user2, created_at) VALUES ($1, $2, $3)",
            )
            .bind(&user1)
            .bind(&user2)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(SendRequestOutcome {
                id: reverse_id,
                sender_username: sender.to_string(),
                recipient_username: recipient.to_string(),
                status: FriendRequestStatus::Accepted,
            });
        }

        let id = ulid::Ulid::new().to_string();
        sqlx::query(
            "INSERT INTO friend_requests
                (id, sender_username, recipient_username, status, created_at, updated_at)
             VALUES ($1, $2, $3, 'pending', $4, $4)",
        )
        .bind(&id)
        .bind(sender)
        .bind(recipient)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        return Ok(SendRequestOutcome {
            id,
            sender_username: sender.to_string(),
            recipient_username: recipient.to_string(),
            status: FriendRequestStatus::Pending,
        });
    }

    let mut requests = state.friend_requests.write().await;
    let has_forward = requests
        .values()
        .any(|r| r.sender_username == sender && r.recipient_username == recipient);
    if has_forward {
        return Err(AppError::FriendRequestAlreadyExists);
    }

    let reverse_pending_id = requests
        .values()
        .find(|r| {
            r.sender_username == recipient
                && r.recipient_username == sender
                && r.status == FriendRequestStatus::Pending
        })
        .map(|r| r.id.clone());

    let now = chrono::Utc::now();
    if let Some(reverse_id) = reverse_pending_id {
        requests.remove(&reverse_id);
        drop(requests);
        let (user1, user2) = canonical_pair(sender, recipient);
        state.friendships.write().await.insert((user1, user2));
        return Ok(SendRequestOutcome {
            id: reverse_id,
            sender_username: sender.to_string(),
            recipient_username: recipient.to_string(),
            status: FriendRequestStatus::Accepted,
        });
    }

    let id = ulid::Ulid::new().to_string();
    requests.insert(
        id.clone(),
        FriendRequestRecord {
            id: id.clone(),
            sender_username: sender.to_string(),
            recipient_username: recipient.to_string(),
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        },
    );
    Ok(SendRequestOutcome {
        id,
        sender_username: sender.to_string(),
        recipient_username: recipient.to_string(),
        status: FriendRequestStatus::Pending,
    })
}

async fn find_request(state: &AppState, request_id: &str) -> Option<FriendRequestRecord> {
    if let Some(pool) = &state.db_pool {
        let row = sqlx::query(
            "SELECT id, sender_username, recipient_username, status, created_at, updated_at
             FROM friend_requests WHERE id = $1",
        )
        .bind(request_id)
        .fetch_optional(pool)
        .await
        .ok()??;
        let status: String = row.get("status");
        return Some(FriendRequestRecord {
            id: row.get("id"),
            sender_username: row.get("sender_username"),
            recipient_username: row.get("recipient_username"),
            status: FriendRequestStatus::parse(&status)?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        });
    }
    state.friend_requests.read().await.get(request_id).cloned()
}

pub async fn accept_request(
    state: &AppState,
    request_id: &str,
    acting_username: &str,
) -> Result<UserRecord, AppError> {
    let request = find_request(state, request_id)
        .await
        .ok_or(AppError::FriendRequestNotFound)?;
    if request.recipient_username != acting_username {
        return Err(AppError::NotAuthorized);
    }
    if request.status != FriendRequestStatus::Pending {
        return Err(AppError::InvalidFriendRequestState);
    }

    let (user1, user2) = canonical_pair(&request.sender_username, &request.recipient_username);
    let now = chrono::Utc::now();

    if let Some(pool) = &state.db_pool {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM friend_requests WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO friendships (user1, user2, created_at) VALUES ($1, $2, $3)")
            .bind(&user1)
            .bind(&user2)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    } else {
        state.friend_requests.write().await.remove(request_id);
        state.friendships.write().await.insert((user1, user2));
    }

    find_user_by_username(state, &request.sender_username)
        .await
        .ok_or(AppError::UserNotFound)
}

pub async fn reject_request(
    state: &AppState,
    request_id: &str,
    acting_username: &str,
) -> Result<UserRecord, AppError> {
    let request = find_request(state, request_id)
        .await
        .ok_or(AppError::FriendRequestNotFound)?;
    if request.recipient_username != acting_username {
        return Err(AppError::NotAuthorized);
    }
    if request.status != FriendRequestStatus::Pending {
        return Err(AppError::InvalidFriendRequestState);
    }

    let now = chrono::Utc::now();
    if let Some(pool) = &state.db_pool {
        sqlx::query("UPDATE friend_requests SET status = 'rejected', updated_at = $2 WHERE id = $1")
            .bind(request_id)
            .bind(now)
            .execute(pool)
            .await?;
    } else if let Some(stored) = state.friend_requests.write().await.get_mut(request_id) {
        stored.status = FriendRequestStatus::Rejected;
        stored.updated_at = now;
    }

    find_user_by_username(state, &request.sender_username)
        .await
        .ok_or(AppError::UserNotFound)
}

/// Requests addressed to `username` that are still awaiting a response.
pub async fn list_received(state: &AppState, username: &str) -> Vec<FriendRequestRecord> {
    if let Some(pool) = &state.db_pool {
        let rows = sqlx::query(
            "SELECT id, sender_username, recipient_username, status, created_at, updated_at
             FROM friend_requests
             WHERE recipient_username = $1 AND status = 'pending'
             ORDER BY created_at",
        )
        .bind(username)
        .fetch_all(pool)
        .await
        .unwrap_or_default();
        return rows
            .into_iter()
            .filter_map(|row| {
                let status: String = row.get("status");
                Some(FriendRequestRecord {
                    id: row.get("id"),
                    sender_username: row.get("sender_username"),
                    recipient_username: row.get("recipient_username"),
                    status: FriendRequestStatus::parse(&status)?,
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                })
            })
            .collect();
    }
    let mut requests: Vec<_> = state
        .friend_requests
        .read()
        .await
        .values()
        .filter(|r| r.recipient_username == username && r.status == FriendRequestStatus::Pending)
        .cloned()
        .collect();
    requests.sort_by_key(|r| r.created_at);
    requests
}

/// Requests sent by `username` that are still awaiting a response.
pub async fn list_sent(state: &AppState, username: &str) -> Vec<FriendRequestRecord> {
    if let Some(pool) = &state.db_pool {
        let rows = sqlx::query(
            "SELECT id, sender_username, recipient_username, status, created_at, updated_at
             FROM friend_requests
             WHERE sender_username = $1 AND status = 'pending'
             ORDER BY created_at",
        )
        .bind(username)
        .fetch_all(pool)
        .await
        .unwrap_or_default();
        return rows
            .into_iter()
            .filter_map(|row| {
                let status: String = row.get("status");
                Some(FriendRequestRecord {
                    id: row.get("id"),
                    sender_username: row.get("sender_username"),
                    recipient_username: row.get("recipient_username"),
                    status: FriendRequestStatus::parse(&status)?,
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                })
            })
            .collect();
    }
    let mut requests: Vec<_> = state
        .friend_requests
        .read()
        .await
        .values()
        .filter(|r| r.sender_username == username && r.status == FriendRequestStatus::Pending)
        .cloned()
        .collect();
    requests.sort_by_key(|r| r.created_at);
    requests
}

pub async fn list_friends(state: &AppState, username: &str) -> Vec<UserRecord> {
    let friend_usernames: Vec<String> = if let Some(pool) = &state.db_pool {
        sqlx::query("SELECT user1, user2 FROM friendships WHERE user1 = $1 OR user2 = $1")
            .bind(username)
            .fetch_all(pool)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|row| {
                let user1: String = row.get("user1");
                let user2: String = row.get("user2");
                if user1 == username { user2 } else { user1 }
            })
            .collect()
    } else {
        state
            .friendships
            .read()
            .await
            .iter()
            .filter_map(|(user1, user2)| {
                if user1 == username {
                    Some(user2.clone())
                } else if user2 == username {
                    Some(user1.clone())
                } else {
                    None
                }
            })
            .collect()
    };

    let mut friends = Vec::with_capacity(friend_usernames.len());
    for friend_username in friend_usernames {
        if let Some(user) = find_user_by_username(state, &friend_username).await {
            friends.push(user);
        }
    }
    friends.sort_by(|a, b| a.username.cmp(&b.username));
    friends
}
