//! Safe partial updates.
//!
//! A request's field map becomes an [`UpdateSpec`]; building it against an
//! [`AllowList`] yields an [`UpdatePlan`] whose SQL contains only allow-listed
//! column names and `$n` placeholders. Caller-supplied values are bound, never
//! formatted into the statement.
//!
//! ```rust,ignore
//! const USER_COLUMNS: &[&str] = &["full_name", "email"];
//!
//! let users = AllowList::new("users", "id", USER_COLUMNS, "updated_at")?;
//! let plan = UpdateSpec::from_json(body).build(&users)?;
//! plan.execute_within(&pool, user_id, &deadline).await?;
//! ```

pub mod allow_list;
pub mod update;

pub use allow_list::AllowList;
pub use update::{FieldValue, UpdatePlan, UpdateSpec};
