use std::str::FromStr;
use clap::{Args, Parser, Subcommand};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;

const STATUSES: [&str; 5] = ["abierto", "en_preparacion", "servido", "cerrado", "cancelado"];

#[derive(Parser, Debug)]
#[command(name = "order-client")]
#[command(about = "client cli used by restaurant staffs to manage table orders", version, long_about = None
)]
struct Cli {
    #[arg(long, env = "ORDERS_HOST", default_value = "http://localhost:8080")]
    host: String,
    #[arg(short = 'u', long, help = "Act as this user id")]
    user: Option<i32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// order related ops
    #[command(arg_required_else_help = true)]
    Order(OrderArgs),
    /// item related ops
    #[command(arg_required_else_help = true)]
    Item(ItemArgs),
}

#[derive(Debug, Args)]
struct OrderArgs {
    #[command(subcommand)]
    command: OrderCmds,
}

#[derive(Debug, Subcommand)]
enum OrderCmds {
    /// open an order for a table
    #[command(arg_required_else_help = true)]
    Create {
        #[arg(long, help = "Local (venue) id")]
        local: i32,
        #[arg(long, help = "Table label")]
        table: String,
        #[arg(long = "item", help = "PRODUCT_ID:QUANTITY:UNIT_PRICE[:NOTE]", value_name = "ITEM", num_args = 1.., required = true)]
        items: Vec<ItemSpec>,
    },
    /// show one order with its items
    #[command(arg_required_else_help = true)]
    Show { id: i32 },
    /// list the orders of the current user
    Mine,
    /// show the newest unfinished order of the current user
    Active,
    /// list the orders of a local, newest first
    #[command(arg_required_else_help = true)]
    Local {
        id: i32,
        #[arg(long, value_parser = STATUSES)]
        estado: Option<String>,
        #[arg(long, help = "Table label")]
        mesa: Option<String>,
    },
    /// move an order to another status
    #[command(arg_required_else_help = true)]
    Status {
        id: i32,
        #[arg(value_parser = STATUSES)]
        status: String,
    },
}

#[derive(Debug, Args)]
struct ItemArgs {
    #[arg(short = 'o', help = "Order id to operate", value_parser = clap::value_parser!(i32).range(1..))]
    oid: i32,
    #[command(subcommand)]
    command: ItemCmds,
}

#[derive(Debug, Subcommand)]
enum ItemCmds {
    #[command(arg_required_else_help = true)]
    Add {
        #[arg(long, help = "Product to add.", value_name = "PRODUCT_ID")]
        product: i32,
        #[arg(long, default_value_t = 1)]
        quantity: i32,
        #[arg(long)]
        note: Option<String>,
    },
    #[command(arg_required_else_help = true)]
    Update {
        #[arg(help = "Id of the item to change.", value_name = "ITEM_ID")]
        id: i32,
        #[arg(long)]
        quantity: Option<i32>,
        #[arg(long, help = "New note, empty string clears it")]
        note: Option<String>,
    },
    #[command(arg_required_else_help = true)]
    Remove {
        #[arg(help = "Id of the item to remove.", value_name = "ITEM_ID")]
        id: i32,
    },
}

#[derive(Debug, Clone, Serialize)]
struct ItemSpec {
    #[serde(rename = "productoId")]
    product_id: i32,
    #[serde(rename = "cantidad")]
    quantity: i32,
    #[serde(rename = "precio")]
    unit_price: i64,
    #[serde(rename = "comentario", skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

fn spec_field<T>(part: Option<&str>, what: &str, spec: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    part.ok_or(format!("missing {what} in {spec}"))?
        .trim()
        .parse()
        .map_err(|e| format!("invalid {what} in {spec}, {e}"))
}

impl FromStr for ItemSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':');
        Ok(Self {
            product_id: spec_field(parts.next(), "product id", s)?,
            quantity: spec_field(parts.next(), "quantity", s)?,
            unit_price: spec_field(parts.next(), "unit price", s)?,
            note: parts.next().map(|n| n.to_string()),
        })
    }
}

/// attach the identity header when a user was given
fn as_user(req: RequestBuilder, user: Option<i32>) -> RequestBuilder {
    match user {
        Some(id) => req.header("X-User-Id", id.to_string()),
        None => req,
    }
}

async fn report(res: reqwest::Response, ok: StatusCode, what: &str) -> Result<(), anyhow::Error> {
    let status = res.status();
    let body = res.json::<serde_json::Value>().await.unwrap_or_default();
    match status {
        s if s == ok => {
            println!("{} succeeded", what);
            println!("{}", serde_json::to_string_pretty(&body)?);
        },
        StatusCode::BAD_REQUEST => {
            println!("{} rejected, {}", what, body["error"]);
        },
        StatusCode::NOT_FOUND => {
            println!("Resource not found, {}", body["error"]);
        },
        StatusCode::UNAUTHORIZED => {
            println!("{} needs a user, pass -u <USER_ID>", what);
        },
        StatusCode::FORBIDDEN => {
            println!("{} refused, {}", what, body["error"]);
        },
        unexpected => {
            println!("got unexpected status code, {}", unexpected);
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Cli::parse();
    let host = args.host.trim_end_matches('/').to_string();
    let client = Client::new();

    match args.command {
        Commands::Order(order) => {
            match order.command {
                OrderCmds::Create { local, table, items } => {
                    let total = items
                        .iter()
                        .map(|i| i64::from(i.quantity).saturating_mul(i.unit_price))
                        .fold(0i64, i64::saturating_add);
                    println!("opening order for table={} at local={}", table, local);
                    let res = as_user(client.post(format!("{}/v1/orders", host)), args.user)
                        .json(&serde_json::json!({
                            "localId": local,
                            "mesaNumero": table,
                            "items": items,
                            "total": total,
                        }))
                        .send()
                        .await?;
                    report(res, StatusCode::CREATED, "order creation").await?;
                },
                OrderCmds::Show { id } => {
                    let res = client.get(format!("{}/v1/orders/{}", host, id)).send().await?;
                    report(res, StatusCode::OK, "order lookup").await?;
                },
                OrderCmds::Mine => {
                    let res = as_user(client.get(format!("{}/v1/orders/mine", host)), args.user)
                        .send()
                        .await?;
                    report(res, StatusCode::OK, "order listing").await?;
                },
                OrderCmds::Active => {
                    let res = as_user(client.get(format!("{}/v1/orders/mine/active", host)), args.user)
                        .send()
                        .await?;
                    report(res, StatusCode::OK, "active order lookup").await?;
                },
                OrderCmds::Local { id, estado, mesa } => {
                    let mut query = Vec::new();
                    if let Some(estado) = estado {
                        query.push(("estado", estado));
                    }
                    if let Some(mesa) = mesa {
                        query.push(("mesa", mesa));
                    }
                    let res = client
                        .get(format!("{}/v1/locals/{}/orders", host, id))
                        .query(&query)
                        .send()
                        .await?;
                    report(res, StatusCode::OK, "local order listing").await?;
                },
                OrderCmds::Status { id, status } => {
                    println!("moving order={} to {}", id, status);
                    let res = client
                        .patch(format!("{}/v1/orders/{}/status", host, id))
                        .json(&serde_json::json!({ "estado": status }))
                        .send()
                        .await?;
                    report(res, StatusCode::OK, "status change").await?;
                },
            }
        },
        Commands::Item(item) => {
            let order_id = item.oid;
            match item.command {
                ItemCmds::Add { product, quantity, note } => {
                    println!("adding product={} to order={}", product, order_id);
                    let res = as_user(client.post(format!("{}/v1/orders/{}/items", host, order_id)), args.user)
                        .json(&serde_json::json!({
                            "productoId": product,
                            "cantidad": quantity,
                            "observaciones": note,
                        }))
                        .send()
                        .await?;
                    report(res, StatusCode::CREATED, "item creation").await?;
                },
                ItemCmds::Update { id, quantity, note } => {
                    println!("updating item={} of order={}", id, order_id);
                    let res = as_user(client.put(format!("{}/v1/orders/{}/items/{}", host, order_id, id)), args.user)
                        .json(&serde_json::json!({
                            "cantidad": quantity,
                            "observaciones": note,
                        }))
                        .send()
                        .await?;
                    report(res, StatusCode::OK, "item update").await?;
                },
                ItemCmds::Remove { id } => {
                    println!("removing item={} from order={}", id, order_id);
                    let res = as_user(client.delete(format!("{}/v1/orders/{}/items/{}", host, order_id, id)), args.user)
                        .send()
                        .await?;
                    report(res, StatusCode::OK, "item removal").await?;
                },
            }
        },
    };
    Ok(())
}
