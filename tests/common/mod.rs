#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shop_import::{
    auth::PasswordHasher,
    config::{AppConfig, ImportConfig},
    db::{self, DbPool},
    services::importer::Importer,
};
use tempfile::TempDir;

pub const PRODUCTS_CSV: &str = "\u{feff}Артикул,Наименование товара,Единица измерения,Цена,Поставщик,Производитель,Категория товара,Действующая скидка,Кол-во на складе,Описание товара,Фото
A112T4,Ботинки,шт.,4990,Kari,Kari,Женская обувь,3,6,Женские Ботинки демисезонные kari,1.jpg
F635R4,Ботинки,шт.,3244,Обувь для вас,Marco Tozzi,Женская обувь,2,13,Ботинки Marco Tozzi женские демисезонные,2.jpg
H782T5,Туфли,шт.,4499,Kari,Kari,Мужская обувь,4,5,Туфли kari мужские классика,3.jpg
G783F5,Ботинки,шт.,5900,Kari,Рос,Мужская обувь,2,8,Мужские ботинки натуральная кожа,
K345R4,Кеды,,2100,Обувь для вас,CROSBY,Детская обувь,,3,Кеды детские,
,Без артикула,шт.,100,Kari,Kari,Мужская обувь,,,,
J384T6,Без цены,шт.,,Kari,Kari,Мужская обувь,,,,
";

pub const DELIVERY_POINTS_CSV: &str = "\u{feff}\"420151, г. Лесной, ул. Вишневая, 32\"
\"125061, г. Лесной, ул. Подгорная, 8\"
\"630370, г. Лесной, ул. Шоссейная, 24\"
";

pub const USERS_CSV: &str = "\u{feff}Роль сотрудника,ФИО,Логин,Пароль
Администратор,Никифорова Весения Николаевна,94d5ous@gmail.com,uzWC67
Менеджер,Степанов Михаил Артёмович,uth4iz@mail.com,2L6KZG
Авторизированный клиент,Михайлюк Анна Вячеславовна,yzls62@outlook.com,JlFRCZ
Стажер,Ситдиков Рустам Иванович,trainee@mail.com,abc123
Менеджер,Без пароля,nopass@mail.com,
";

pub const ORDERS_CSV: &str = "\u{feff}Номер заказа,Артикул заказа,Дата заказа,Дата доставки,Адрес пункта выдачи,ФИО авторизированного клиента,Код для получения,Статус заказа
1,\"A112T4, 2, F635R4, 2\",2025-02-27 00:00:00,2025-04-20 00:00:00,2,Степанов Михаил Артёмович,901,Завершен
2,\"H782T5, 1, G783F5, 1\",2022-09-28 00:00:00,2025-04-21 00:00:00,0,Никифорова Весения Николаевна,902,Новый
3,\"J384T6, 10, A112T4, 1\",2025-03-21 00:00:00,2025-04-22 00:00:00,99,Михайлюк Анна Вячеславовна,903,Отменен
4,\"F635R4, 3, H782T5\",2025-02-20 00:00:00,2025-04-23 00:00:00,abc,Михайлюк Анна Вячеславовна,904,
5,,2025-02-21 00:00:00,2025-04-24 00:00:00,,Степанов Михаил Артёмович,,В обработке
6,\"A112T4, 1\",,2025-04-25 00:00:00,1,Степанов Михаил Артёмович,905,Новый
7,\"A112T4, 1\",27.02.2025,2025-04-25 00:00:00,1,Степанов Михаил Артёмович,906,Новый
";

/// Temporary data directory plus a migrated SQLite database file.
pub struct TestEnv {
    _dir: TempDir,
    pub data_dir: PathBuf,
    pub db: Arc<DbPool>,
}

impl TestEnv {
    /// Fresh database with the standard fixture files written.
    pub async fn new() -> Self {
        let env = Self::empty().await;
        env.write(&env.import_config().products_file, PRODUCTS_CSV);
        env.write(&env.import_config().delivery_points_file, DELIVERY_POINTS_CSV);
        env.write(&env.import_config().users_file, USERS_CSV);
        env.write(&env.import_config().orders_file, ORDERS_CSV);
        env
    }

    /// Fresh database and an empty data directory.
    pub async fn empty() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let data_dir = dir.path().join("import");
        std::fs::create_dir_all(&data_dir).expect("failed to create data dir");

        let db_path = dir.path().join("shop.db");
        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        Self {
            _dir: dir,
            data_dir,
            db: Arc::new(pool),
        }
    }

    pub fn import_config(&self) -> ImportConfig {
        ImportConfig::from_dir(&self.data_dir)
    }

    pub fn write(&self, file: &str, contents: &str) {
        std::fs::write(self.data_dir.join(file), contents).expect("failed to write fixture");
    }

    pub fn remove(&self, file: &str) {
        std::fs::remove_file(self.data_dir.join(file)).expect("failed to remove fixture");
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn importer(&self) -> Importer {
        self.importer_with(self.import_config())
    }

    pub fn importer_with(&self, config: ImportConfig) -> Importer {
        Importer::new(self.db.clone(), config).with_hasher(fast_hasher())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Cheap argon2 parameters so tests do not spend seconds hashing.
pub fn fast_hasher() -> PasswordHasher {
    PasswordHasher::with_params(1024, 1, 1).expect("valid argon2 params")
}
