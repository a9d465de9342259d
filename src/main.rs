use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, warn};

use shop_import::{
    auth::{AuthService, Role},
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::OrderStatus,
    services::{
        catalog::{CatalogService, ProductInput, ProductQuery, ProductView, QuantitySort},
        importer::{orders::parse_timestamp, parse_line_items, Importer},
        orders::{OrderInput, OrderLine, OrderService, OrderView},
    },
    ServiceError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("error: {:#}", err);
            let code = err
                .downcast_ref::<ServiceError>()
                .map(ServiceError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let context = CliContext::initialize(&cli.command).await?;
    let json = cli.json;

    let outcome = match cli.command {
        Commands::Import(args) => handle_import(&context, args, json).await,
        Commands::Migrate => handle_migrate(&context).await,
        Commands::Products(args) => handle_products(&context, args, json).await,
        Commands::AddProduct(args) => handle_add_product(&context, args, json).await,
        Commands::EditProduct(args) => handle_edit_product(&context, args, json).await,
        Commands::DeleteProduct(args) => handle_delete_product(&context, args).await,
        Commands::Orders(args) => handle_orders(&context, args, json).await,
        Commands::AddOrder(args) => handle_add_order(&context, args, json).await,
        Commands::EditOrder(args) => handle_edit_order(&context, args, json).await,
        Commands::DeleteOrder(args) => handle_delete_order(&context, args).await,
        Commands::Login(args) => handle_login(&context, args, json).await,
    };

    let closed = context.close().await;
    outcome.and(closed)
}

#[derive(Parser)]
#[command(
    name = "shop-import",
    about = "Seed the shop database from CSV exports and query the result",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wipe the dataset and rebuild it from the CSV exports
    Import(ImportArgs),
    /// Apply the database schema
    Migrate,
    /// List products as the given role sees them
    Products(ProductsArgs),
    /// Add a product (admin only)
    AddProduct(ProductArgs),
    /// Replace every field of a product (admin only)
    EditProduct(EditProductArgs),
    /// Delete a product no order uses (admin only)
    DeleteProduct(DeleteProductArgs),
    /// List orders (manager and admin only)
    Orders(OrdersArgs),
    /// Add an order with its line items (admin only)
    AddOrder(OrderArgs),
    /// Replace an order and its line items (admin only)
    EditOrder(EditOrderArgs),
    /// Delete an order and its line items (admin only)
    DeleteOrder(DeleteOrderArgs),
    /// Check a login against the imported credentials
    Login(LoginArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Directory holding the four CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Roll back everything if the import aborts
    #[arg(long, action = ArgAction::SetTrue)]
    atomic: bool,
}

#[derive(Args)]
struct ProductsArgs {
    #[arg(long, value_enum, default_value_t = RoleArg::Guest)]
    role: RoleArg,
    #[arg(long)]
    search: Option<String>,
    /// Supplier id
    #[arg(long)]
    supplier: Option<i32>,
    /// Order by stock quantity
    #[arg(long, value_enum)]
    sort: Option<SortArg>,
}

#[derive(Args)]
struct ProductArgs {
    #[arg(long, value_enum)]
    role: RoleArg,
    #[arg(long)]
    article: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "шт.")]
    unit: String,
    #[arg(long)]
    price: Decimal,
    /// Percent
    #[arg(long, default_value_t = Decimal::ZERO)]
    discount: Decimal,
    #[arg(long, default_value_t = 0)]
    quantity: i32,
    #[arg(long, default_value = "")]
    description: String,
    /// Path relative to the media root
    #[arg(long)]
    photo: Option<String>,
    #[arg(long)]
    category: String,
    #[arg(long)]
    manufacturer: String,
    #[arg(long)]
    supplier: String,
}

impl From<ProductArgs> for ProductInput {
    fn from(args: ProductArgs) -> Self {
        ProductInput {
            article: args.article,
            name: args.name,
            unit: args.unit,
            price: args.price,
            discount: args.discount,
            quantity: args.quantity,
            description: args.description,
            photo: args.photo,
            category: args.category,
            manufacturer: args.manufacturer,
            supplier: args.supplier,
        }
    }
}

#[derive(Args)]
struct EditProductArgs {
    /// Article of the product to change
    target: String,
    #[command(flatten)]
    product: ProductArgs,
}

#[derive(Args)]
struct DeleteProductArgs {
    #[arg(long, value_enum)]
    role: RoleArg,
    article: String,
}

#[derive(Args)]
struct OrdersArgs {
    #[arg(long, value_enum, default_value_t = RoleArg::Manager)]
    role: RoleArg,
}

#[derive(Args)]
struct OrderArgs {
    #[arg(long, value_enum)]
    role: RoleArg,
    #[arg(long)]
    number: i32,
    /// `YYYY-MM-DD HH:MM:SS`
    #[arg(long)]
    order_date: String,
    /// `YYYY-MM-DD HH:MM:SS`
    #[arg(long)]
    delivery_date: String,
    /// Delivery point id
    #[arg(long)]
    point: Option<i32>,
    #[arg(long, default_value = "")]
    customer: String,
    #[arg(long, default_value_t = 0)]
    pickup_code: i32,
    #[arg(long, value_enum, default_value_t = StatusArg::Pending)]
    status: StatusArg,
    /// Line items as "ART1, qty, ART2, qty"
    #[arg(long, default_value = "")]
    items: String,
}

impl OrderArgs {
    fn into_input(self) -> Result<OrderInput> {
        let parsed = parse_line_items(&self.items);
        if parsed.invalid_quantities > 0 {
            return Err(ServiceError::ValidationError(format!(
                "invalid quantity in line items '{}'",
                self.items
            ))
            .into());
        }

        Ok(OrderInput {
            order_number: self.number,
            order_date: timestamp(&self.order_date)?,
            delivery_date: timestamp(&self.delivery_date)?,
            delivery_point_id: self.point,
            customer_name: self.customer,
            pickup_code: self.pickup_code,
            status: self.status.into(),
            items: parsed.items.into_iter().map(OrderLine::from).collect(),
        })
    }
}

fn timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = parse_timestamp(raw).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "'{}' is not a YYYY-MM-DD HH:MM:SS timestamp",
            raw
        ))
    })?;
    Ok(parsed)
}

#[derive(Args)]
struct EditOrderArgs {
    /// Order id
    id: i32,
    #[command(flatten)]
    order: OrderArgs,
}

#[derive(Args)]
struct DeleteOrderArgs {
    #[arg(long, value_enum)]
    role: RoleArg,
    /// Order id
    id: i32,
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    Manager,
    Client,
    Guest,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::Manager => Role::Manager,
            RoleArg::Client => Role::Client,
            RoleArg::Guest => Role::Guest,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for QuantitySort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Asc => QuantitySort::Asc,
            SortArg::Desc => QuantitySort::Desc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Completed,
    Cancelled,
}

impl From<StatusArg> for OrderStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => OrderStatus::Pending,
            StatusArg::Completed => OrderStatus::Completed,
            StatusArg::Cancelled => OrderStatus::Cancelled,
        }
    }
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize(command: &Commands) -> Result<Self> {
        let config = config::load_config()
            .map_err(ServiceError::from)
            .context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        if config.auto_migrate && !matches!(command, Commands::Migrate) {
            db::run_migrations(&db_pool).await?;
        }

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn catalog_service(&self) -> CatalogService {
        CatalogService::new(self.db.clone())
    }

    fn order_service(&self) -> OrderService {
        OrderService::new(self.db.clone())
    }

    fn auth_service(&self) -> AuthService {
        AuthService::new(self.db.clone())
    }

    async fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.db) {
            Ok(pool) => db::close_pool(pool).await?,
            Err(_) => warn!("database pool still shared at exit, leaving it open"),
        }
        Ok(())
    }
}

async fn handle_import(context: &CliContext, args: ImportArgs, json: bool) -> Result<()> {
    let mut import_config = context.config.import.clone();
    if let Some(dir) = args.data_dir {
        import_config.data_dir = dir;
    }
    if args.atomic {
        import_config.atomic = true;
    }

    let summary = Importer::new(context.db.clone(), import_config).run().await?;

    if json {
        print_json(&summary)?;
    } else {
        println!("Import completed successfully!");
        println!("{}", summary);
        for unresolved in &summary.unresolved_articles {
            println!(
                "  unresolved article {} in order {}",
                unresolved.article, unresolved.order_number
            );
        }
    }

    Ok(())
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db).await?;
    println!("Migrations applied");
    Ok(())
}

async fn handle_products(context: &CliContext, args: ProductsArgs, json: bool) -> Result<()> {
    let query = ProductQuery {
        search: args.search,
        supplier_id: args.supplier,
        sort_quantity: args.sort.map(Into::into),
    };

    let products = context
        .catalog_service()
        .list_products(args.role.into(), query)
        .await?;

    if json {
        print_json(&products)?;
    } else if products.is_empty() {
        println!("No products found");
    } else {
        for product in &products {
            render_product(product);
        }
    }

    Ok(())
}

async fn handle_add_product(context: &CliContext, args: ProductArgs, json: bool) -> Result<()> {
    let role = args.role.into();
    let product = context
        .catalog_service()
        .create_product(role, args.into())
        .await?;

    if json {
        print_json(&product)?;
    } else {
        println!("Product added");
        render_product(&product);
    }
    Ok(())
}

async fn handle_edit_product(
    context: &CliContext,
    args: EditProductArgs,
    json: bool,
) -> Result<()> {
    let role = args.product.role.into();
    let product = context
        .catalog_service()
        .update_product(role, &args.target, args.product.into())
        .await?;

    if json {
        print_json(&product)?;
    } else {
        println!("Product updated");
        render_product(&product);
    }
    Ok(())
}

async fn handle_delete_product(context: &CliContext, args: DeleteProductArgs) -> Result<()> {
    context
        .catalog_service()
        .delete_product(args.role.into(), &args.article)
        .await?;
    println!("Product {} deleted", args.article);
    Ok(())
}

async fn handle_orders(context: &CliContext, args: OrdersArgs, json: bool) -> Result<()> {
    let orders = context.order_service().list_orders(args.role.into()).await?;

    if json {
        print_json(&orders)?;
    } else if orders.is_empty() {
        println!("No orders found");
    } else {
        for order in &orders {
            render_order(order);
        }
    }

    Ok(())
}

async fn handle_add_order(context: &CliContext, args: OrderArgs, json: bool) -> Result<()> {
    let role = args.role.into();
    let order = context
        .order_service()
        .create_order(role, args.into_input()?)
        .await?;

    if json {
        print_json(&order)?;
    } else {
        println!("Order added");
        render_order(&order);
    }
    Ok(())
}

async fn handle_edit_order(context: &CliContext, args: EditOrderArgs, json: bool) -> Result<()> {
    let role = args.order.role.into();
    let order = context
        .order_service()
        .update_order(role, args.id, args.order.into_input()?)
        .await?;

    if json {
        print_json(&order)?;
    } else {
        println!("Order updated");
        render_order(&order);
    }
    Ok(())
}

async fn handle_delete_order(context: &CliContext, args: DeleteOrderArgs) -> Result<()> {
    context
        .order_service()
        .delete_order(args.role.into(), args.id)
        .await?;
    println!("Order {} deleted", args.id);
    Ok(())
}

async fn handle_login(context: &CliContext, args: LoginArgs, json: bool) -> Result<()> {
    let user = context
        .auth_service()
        .authenticate(&args.username, &args.password)
        .await?
        .ok_or_else(|| ServiceError::Forbidden("invalid username or password".to_string()))?;

    if json {
        print_json(&user)?;
    } else {
        println!("{} authenticated as {} ({})", user.username, user.role, user.full_name);
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_product(product: &ProductView) {
    println!(
        "- {} • {} • {} ₽ • discount {}% • stock {} {} • {} / {} / {}",
        product.article,
        product.name,
        product.price,
        product.discount,
        product.quantity,
        product.unit,
        product.category,
        product.manufacturer,
        product.supplier
    );
}

fn render_order(order: &OrderView) {
    println!(
        "- Order {} • {} • status {} • ordered {} • delivery {} • code {}",
        order.order_number,
        order.customer_name,
        order.status,
        order.order_date.format("%Y-%m-%d %H:%M"),
        order.delivery_date.format("%Y-%m-%d %H:%M"),
        order.pickup_code
    );
    if let Some(address) = &order.delivery_address {
        println!("    pickup: {}", address);
    }
    for item in &order.items {
        println!("    {} × {}", item.article, item.quantity);
    }
}
