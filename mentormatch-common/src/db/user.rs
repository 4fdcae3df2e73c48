use chrono::Utc;
use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use crate::db::{DaoError, DbThreadPool};
use crate::models::user::{NewUser, User, UserProfileChangeset, UserRole};

use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_user(
        &mut self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: UserRole,
    ) -> Result<i32, DaoError> {
        let current_time = Utc::now().naive_utc();

        let new_user = NewUser {
            email,
            password_hash,
            name,
            role,
            created_at: current_time,
            updated_at: current_time,
        };

        let mut db_connection = self.db_thread_pool.get()?;

        let user_id = dsl::insert_into(users)
            .values(&new_user)
            .returning(user_fields::id)
            .get_result::<i32>(&mut db_connection)?;

        Ok(user_id)
    }

    pub fn get_user_by_id(&mut self, user_id: i32) -> Result<User, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users.find(user_id).first::<User>(&mut db_connection)?)
    }

    pub fn get_user_by_email(&mut self, user_email: &str) -> Result<User, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users
            .filter(user_fields::email.eq(user_email))
            .first::<User>(&mut db_connection)?)
    }

    /// Looks up the identity attached to a verified token. Returns `None` when the
    /// referenced user no longer exists.
    pub fn get_identity(
        &mut self,
        user_id: i32,
    ) -> Result<Option<(i32, String, UserRole)>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users
            .select((user_fields::id, user_fields::email, user_fields::role))
            .find(user_id)
            .first::<(i32, String, UserRole)>(&mut db_connection)
            .optional()?)
    }

    pub fn update_profile(
        &mut self,
        user_id: i32,
        name: Option<&str>,
        bio: Option<&str>,
        skills_json: Option<&str>,
    ) -> Result<(), DaoError> {
        if name.is_none() && bio.is_none() && skills_json.is_none() {
            return Ok(());
        }

        let changeset = UserProfileChangeset {
            name,
            bio,
            skills: skills_json,
            updated_at: Utc::now().naive_utc(),
        };

        let mut db_connection = self.db_thread_pool.get()?;

        dsl::update(users.find(user_id))
            .set(&changeset)
            .execute(&mut db_connection)?;

        Ok(())
    }

    pub fn set_profile_image(
        &mut self,
        user_id: i32,
        image_data: &[u8],
        image_type: &str,
    ) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        dsl::update(users.find(user_id))
            .set((
                user_fields::image_data.eq(image_data),
                user_fields::image_type.eq(image_type),
                user_fields::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut db_connection)?;

        Ok(())
    }

    pub fn get_profile_image(
        &mut self,
        user_id: i32,
    ) -> Result<Option<(UserRole, Option<Vec<u8>>, Option<String>)>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users
            .select((
                user_fields::role,
                user_fields::image_data,
                user_fields::image_type,
            ))
            .find(user_id)
            .first::<(UserRole, Option<Vec<u8>>, Option<String>)>(&mut db_connection)
            .optional()?)
    }

    pub fn get_mentors(&mut self) -> Result<Vec<User>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users
            .filter(user_fields::role.eq(UserRole::Mentor))
            .order(user_fields::name.asc())
            .load::<User>(&mut db_connection)?)
    }
}
