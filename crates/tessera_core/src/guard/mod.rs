//! Resource guards.
//!
//! Every backend operation runs under a [`GuardConnection`], which holds
//! the connection lock and owns the commit window, and a
//! [`GuardStatement`], which holds the statement's slots. Both are RAII
//! types: dropping them releases the locks and settles pending work.
//!
//! ```rust,ignore
//! let guard = GuardConnection::new(&conn)?;
//! let mut stmt = GuardStatement::new(&guard, &read)?;
//! stmt.set_input(0, 6)?;
//! stmt.execute()?;
//! while stmt.fetch()? {
//!     println!("{}", stmt.output(0)?);
//! }
//! ```

mod connection;
mod statement;

pub use connection::GuardConnection;
pub use statement::GuardStatement;
