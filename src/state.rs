use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::credentials::Authenticator;
use crate::auth::token::TokenService;
use crate::config::Config;
use crate::db::comments::CommentRepository;
use crate::db::posts::PostRepository;
use crate::db::reactions::ReactionRepository;
use crate::db::users::UserRepository;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let tokens = TokenService::new(&config.jwt);
        Self { db, config, tokens }
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db.clone())
    }

    pub fn posts(&self) -> PostRepository {
        PostRepository::new(self.db.clone())
    }

    pub fn comments(&self) -> CommentRepository {
        CommentRepository::new(self.db.clone())
    }

    pub fn reactions(&self) -> ReactionRepository {
        ReactionRepository::new(self.db.clone())
    }

    pub fn authenticator(&self) -> Authenticator<UserRepository> {
        Authenticator::new(self.users(), self.config.auth.bcrypt_cost)
    }
}
