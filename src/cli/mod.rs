use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::api::{self, AppState, PlanRequest, PlanResponse};
use crate::core::{
    AccessGate, Catalog, DEFAULT_MASTER_CODE, DEFAULT_TAX_RATE_PERCENT, LegInput, Thresholds,
    ViewMode,
};
use crate::store::{
    self, FileStore, SessionSnapshot, load_snapshot, reset_session, restore_access, save_snapshot,
};

#[derive(Parser, Debug)]
#[command(
    name = "solvency",
    about = "Sales-volume gap planner (personal + leg gaps, cheapest products to close them)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "SOLVENCY_DATA_DIR",
        default_value = ".solvency",
        help = "Directory holding the saved session and access code"
    )]
    data_dir: PathBuf,
    #[arg(
        long,
        global = true,
        env = "SOLVENCY_CATALOG",
        help = "Product catalog JSON; defaults to the built-in catalog"
    )]
    catalog: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "SOLVENCY_DCSV_THRESHOLD",
        default_value_t = 250.0,
        help = "Direct-customer sales volume required to qualify"
    )]
    dcsv_threshold: f64,
    #[arg(
        long,
        global = true,
        env = "SOLVENCY_GSV_THRESHOLD",
        default_value_t = 3000.0,
        help = "Personal group sales volume required to qualify"
    )]
    gsv_threshold: f64,
    #[arg(
        long,
        global = true,
        env = "SOLVENCY_MASTER_CODE",
        default_value = DEFAULT_MASTER_CODE,
        hide_env_values = true
    )]
    master_code: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the web UI and JSON API
    Serve {
        #[arg(long, env = "SOLVENCY_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Apply edits to the saved session and print the plan
    Compute(ComputeArgs),
    /// Open the access gate with the master code or this month's code
    Unlock { code: String },
    /// Zero every figure, keeping leg names
    Reset,
    /// List the product catalog
    Catalog,
}

#[derive(Args, Debug, Default)]
struct ComputeArgs {
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Set personal direct-customer sales volume"
    )]
    dcsv: Option<f64>,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Set personal group sales volume"
    )]
    gsv: Option<f64>,
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = DEFAULT_TAX_RATE_PERCENT,
        help = "Sales tax in percent"
    )]
    tax_rate: f64,
    #[arg(long = "leg-current", value_name = "ID=GSV", value_parser = parse_leg_value)]
    leg_current: Vec<(u32, f64)>,
    #[arg(long = "leg-target", value_name = "ID=GSV", value_parser = parse_leg_value)]
    leg_target: Vec<(u32, f64)>,
    #[arg(
        long = "leg-flex",
        value_name = "ID=PTS",
        value_parser = parse_leg_flex,
        help = "Set a leg's flex points; an empty value clears them"
    )]
    leg_flex: Vec<(u32, Option<f64>)>,
    #[arg(
        long = "leg-reload",
        value_name = "ID=DATE",
        value_parser = parse_leg_text,
        help = "Set a leg's flex reload date; an empty value clears it"
    )]
    leg_reload: Vec<(u32, String)>,
    #[arg(long = "rename-leg", value_name = "ID=NAME", value_parser = parse_leg_text)]
    rename_leg: Vec<(u32, String)>,
    #[arg(long = "add-leg", value_name = "NAME")]
    add_leg: Vec<String>,
    #[arg(long = "remove-leg", value_name = "ID")]
    remove_leg: Vec<u32>,
    #[arg(
        long = "cart",
        value_name = "SKU=QTY",
        value_parser = parse_cart_line,
        help = "Set cart quantity; 0 removes the item"
    )]
    cart: Vec<(String, u32)>,
    #[arg(long, default_value = "", help = "Filter the menu by name or SKU")]
    search: String,
    #[arg(long, help = "Show the full catalog instead of the top 10")]
    all: bool,
    #[arg(long, help = "Access code, if the gate is not already open")]
    code: Option<String>,
}

pub async fn run(cli: Cli) -> Result<(), String> {
    let thresholds = Thresholds {
        direct_customer_volume: cli.dcsv_threshold,
        group_volume: cli.gsv_threshold,
    };
    api::validate_thresholds(&thresholds)?;
    let gate = AccessGate::new(&cli.master_code);
    let file_store = FileStore::new(&cli.data_dir);

    match cli.command {
        Command::Serve { port } => {
            let catalog = load_catalog(cli.catalog.as_ref())?;
            let state = AppState {
                catalog,
                thresholds,
                gate,
            };
            api::run_http_server(port, state)
                .await
                .map_err(|e| format!("Server error: {e}"))
        }
        Command::Compute(args) => {
            let catalog = load_catalog(cli.catalog.as_ref())?;
            ensure_access(&file_store, &gate, args.code.as_deref())?;

            let mut snapshot = load_snapshot(&file_store);
            apply_edits(&mut snapshot, &args, &catalog)?;
            let request = PlanRequest {
                personal: snapshot.personal_stats,
                legs: snapshot.legs.clone(),
                tax_rate_percent: args.tax_rate,
                cart: snapshot.cart.clone(),
                search: args.search.clone(),
                view_mode: if args.all {
                    ViewMode::All
                } else {
                    ViewMode::Top10
                },
            };
            api::validate_plan(&request)?;
            save_snapshot(&file_store, &snapshot).map_err(|e| e.to_string())?;

            let plan = api::build_plan_response(&catalog, &thresholds, &request);
            print!("{}", render_plan(&plan, &request));
            Ok(())
        }
        Command::Unlock { code } => {
            let today = Local::now().date_naive();
            if store::unlock(&file_store, &gate, &code, today).map_err(|e| e.to_string())? {
                println!("Access granted.");
                Ok(())
            } else {
                Err("ACCESS DENIED. INVALID FREQUENCY.".to_string())
            }
        }
        Command::Reset => {
            let mut snapshot = load_snapshot(&file_store);
            reset_session(&file_store, &mut snapshot).map_err(|e| e.to_string())?;
            save_snapshot(&file_store, &snapshot).map_err(|e| e.to_string())?;
            println!("Session reset; {} legs kept.", snapshot.legs.len());
            Ok(())
        }
        Command::Catalog => {
            let catalog = load_catalog(cli.catalog.as_ref())?;
            print!("{}", render_catalog(&catalog));
            Ok(())
        }
    }
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog, String> {
    let catalog = match path {
        Some(path) => Catalog::from_path(path),
        None => Catalog::embedded(),
    }
    .map_err(|e| e.to_string())?;
    tracing::debug!(products = catalog.len(), "catalog loaded");
    Ok(catalog)
}

fn ensure_access(
    file_store: &FileStore,
    gate: &AccessGate,
    code: Option<&str>,
) -> Result<(), String> {
    let today = Local::now().date_naive();
    let granted = match code {
        Some(code) => store::unlock(file_store, gate, code, today),
        None => restore_access(file_store, gate, today),
    }
    .map_err(|e| e.to_string())?;

    if granted {
        Ok(())
    } else if code.is_some() {
        Err("ACCESS DENIED. INVALID FREQUENCY.".to_string())
    } else {
        Err("Access locked: run `solvency unlock <code>` or pass --code".to_string())
    }
}

fn apply_edits(
    snapshot: &mut SessionSnapshot,
    args: &ComputeArgs,
    catalog: &Catalog,
) -> Result<(), String> {
    if let Some(v) = args.dcsv {
        snapshot.personal_stats.current_dcsv = v;
    }
    if let Some(v) = args.gsv {
        snapshot.personal_stats.current_gsv = v;
    }

    for id in &args.remove_leg {
        let before = snapshot.legs.len();
        snapshot.legs.retain(|leg| leg.id != *id);
        if snapshot.legs.len() == before {
            return Err(format!("--remove-leg: no leg with id {id}"));
        }
    }
    for name in &args.add_leg {
        let id = snapshot.next_leg_id();
        snapshot.legs.push(LegInput::new(id, name.trim(), 0.0, 0.0));
    }
    for (id, value) in &args.leg_current {
        leg_mut(snapshot, *id, "--leg-current")?.current_gsv = *value;
    }
    for (id, value) in &args.leg_target {
        leg_mut(snapshot, *id, "--leg-target")?.target_gsv = *value;
    }
    for (id, points) in &args.leg_flex {
        leg_mut(snapshot, *id, "--leg-flex")?.flex_points = *points;
    }
    for (id, date) in &args.leg_reload {
        leg_mut(snapshot, *id, "--leg-reload")?.flex_reload_date =
            (!date.is_empty()).then(|| date.clone());
    }
    for (id, name) in &args.rename_leg {
        if name.is_empty() {
            return Err(format!("--rename-leg: leg {id} needs a non-empty name"));
        }
        leg_mut(snapshot, *id, "--rename-leg")?.name = name.clone();
    }

    for (sku, qty) in &args.cart {
        if !catalog.products().iter().any(|p| &p.sku == sku) {
            return Err(format!("--cart: unknown sku {sku}"));
        }
        if *qty == 0 {
            snapshot.cart.remove(sku);
        } else {
            snapshot.cart.insert(sku.clone(), *qty);
        }
    }

    Ok(())
}

fn leg_mut<'a>(
    snapshot: &'a mut SessionSnapshot,
    id: u32,
    flag: &str,
) -> Result<&'a mut LegInput, String> {
    snapshot
        .legs
        .iter_mut()
        .find(|leg| leg.id == id)
        .ok_or_else(|| format!("{flag}: no leg with id {id}"))
}

fn parse_leg_value(raw: &str) -> Result<(u32, f64), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=GSV, got `{raw}`"))?;
    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid leg id `{id}`: {e}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid volume `{value}`: {e}"))?;
    Ok((id, value))
}

fn parse_leg_flex(raw: &str) -> Result<(u32, Option<f64>), String> {
    let (id, points) = parse_leg_text(raw)?;
    if points.is_empty() {
        return Ok((id, None));
    }
    let points = points
        .parse::<f64>()
        .map_err(|e| format!("invalid flex points `{points}`: {e}"))?;
    Ok((id, Some(points)))
}

fn parse_leg_text(raw: &str) -> Result<(u32, String), String> {
    let (id, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got `{raw}`"))?;
    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid leg id `{id}`: {e}"))?;
    Ok((id, text.trim().to_string()))
}

fn parse_cart_line(raw: &str) -> Result<(String, u32), String> {
    let (sku, qty) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected SKU=QTY, got `{raw}`"))?;
    let qty = qty
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid quantity `{qty}`: {e}"))?;
    Ok((sku.trim().to_string(), qty))
}

fn render_plan(plan: &PlanResponse, request: &PlanRequest) -> String {
    let result = &plan.result;
    let mut out = String::new();

    let _ = writeln!(out, "Personal gap   {:>12.2} SV", result.personal_gap);
    let _ = writeln!(out, "Legs gap       {:>12.2} SV", result.legs_gap);
    let _ = writeln!(out, "Total gap      {:>12.2} SV", result.total_gap);
    let _ = writeln!(
        out,
        "Cost to fix    {:>12.2} (best single product, {}% tax)",
        result.cost_to_fix, plan.tax_rate
    );

    let _ = writeln!(out, "\nLegs");
    let _ = writeln!(
        out,
        "  {:>4}  {:<20} {:>12} {:>12} {:>12} {:>9}  {:<10}",
        "id", "name", "current", "target", "gap", "flex pts", "reload"
    );
    for leg in &plan.leg_gaps {
        let flex = leg
            .flex_points
            .map(|points| format!("{points:.1}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:>4}  {:<20} {:>12.2} {:>12.2} {:>12.2} {:>9}  {:<10}",
            leg.id,
            leg.name,
            leg.current_gsv,
            leg.target_gsv,
            leg.gap,
            flex,
            leg.flex_reload_date.as_deref().unwrap_or("-")
        );
    }

    let heading = if !plan.search.trim().is_empty() {
        format!(
            "Found {} {} matching \"{}\"",
            plan.displayed.len(),
            if plan.displayed.len() == 1 {
                "product"
            } else {
                "products"
            },
            plan.search.trim()
        )
    } else {
        match plan.view_mode {
            ViewMode::Top10 => "Most efficient products (top 10)".to_string(),
            ViewMode::All => format!("Showing all {} products", plan.displayed.len()),
        }
    };
    let _ = writeln!(out, "\n{heading}");
    if plan.displayed.is_empty() {
        let _ = writeln!(out, "  No products found.");
    }
    for (rank, entry) in plan.displayed.iter().enumerate() {
        let in_cart = request.cart.get(&entry.product.sku).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "  {:>3}. {:<10} {:<28} ${:>8.2} {:>7.1} SV  ${:>6.3}/SV  x{:<5} ${:>10.2}  cart {}",
            rank + 1,
            entry.product.sku,
            entry.product.name,
            entry.product.member_price,
            entry.product.sv,
            entry.efficiency,
            entry.theoretical_qty,
            entry.theoretical_cost,
            in_cart
        );
    }

    let cart = &plan.cart;
    let _ = writeln!(
        out,
        "\nCart  {:.1} / {:.1} SV  ${:.2}",
        cart.total_sv, result.total_gap, cart.total_cost
    );
    if cart.gap_covered {
        let _ = writeln!(out, "GAP COVERED");
    } else {
        let _ = writeln!(out, "Remaining volume gap {:.2} SV", cart.remaining_gap);
    }
    out
}

fn render_catalog(catalog: &Catalog) -> String {
    let mut out = String::new();
    for product in catalog.products() {
        let _ = writeln!(
            out,
            "{:<10} {:<28} ${:>8.2} {:>7.1} SV {:>7.1} CV{}",
            product.sku,
            product.name,
            product.member_price,
            product.sv,
            product.cv,
            if product.is_bundle { "  bundle" } else { "" }
        );
    }
    out
}
