use colored::*;
use serde_json::json;
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "🚕 Dispatch Insights Testing Tool".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    println!();

    // Paso 1: URL base del servidor
    let base_url = get_base_url()?;

    // Paso 2: Menú principal
    loop {
        println!();
        println!("{}", "📋 MENÚ PRINCIPAL".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. 🚀 Generar reporte de un período");
        println!("2. 🔍 Consultar un reporte guardado");
        println!("3. 🕒 Ver reportes recientes");
        println!("4. 🚪 Salir");
        print!("{}", "Selecciona una opción (1-4): ".bright_yellow());
        io::stdout().flush()?;

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;
        let choice = choice.trim();

        match choice {
            "1" => {
                if let Err(e) = generate_report(&base_url).await {
                    println!("{} {}", "❌ Error:".bright_red(), e);
                }
            }
            "2" => {
                if let Err(e) = fetch_report(&base_url).await {
                    println!("{} {}", "❌ Error:".bright_red(), e);
                }
            }
            "3" => {
                if let Err(e) = recent_reports(&base_url).await {
                    println!("{} {}", "❌ Error:".bright_red(), e);
                }
            }
            "4" => {
                println!("{}", "👋 ¡Hasta luego!".bright_green());
                break;
            }
            _ => {
                println!("{}", "❌ Opción inválida. Intenta de nuevo.".bright_red());
            }
        }
    }

    Ok(())
}

fn get_base_url() -> Result<String, Box<dyn std::error::Error>> {
    print!(
        "{}",
        "URL del servidor [http://localhost:3000]: ".bright_cyan()
    );
    io::stdout().flush()?;
    let mut url = String::new();
    io::stdin().read_line(&mut url)?;
    let url = url.trim();
    if url.is_empty() {
        Ok("http://localhost:3000".to_string())
    } else {
        Ok(url.trim_end_matches('/').to_string())
    }
}

fn prompt(label: &str) -> Result<String, Box<dyn std::error::Error>> {
    print!("{}", label.bright_cyan());
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

async fn generate_report(base_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("{}", "🚀 GENERAR REPORTE".bright_green().bold());
    let period_type = prompt("Tipo de período (daily/weekly/biweekly/monthly): ")?;
    let period_id = prompt("Id del período (vacío = período anterior a hoy): ")?;

    let mut body = json!({ "period_type": period_type });
    if !period_id.is_empty() {
        body["period_id"] = json!(period_id);
    }

    println!("{}", "⏳ Ejecutando pipeline (puede tardar)...".bright_yellow());
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/insights/generate", base_url))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let payload: serde_json::Value = response.json().await?;

    if status.is_success() {
        println!("{}", "✅ Reporte generado:".bright_green());
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{} {} - {}",
            "❌ Falló:".bright_red(),
            status,
            serde_json::to_string_pretty(&payload)?
        );
    }
    Ok(())
}

async fn fetch_report(base_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("{}", "🔍 CONSULTAR REPORTE".bright_green().bold());
    let period_type = prompt("Tipo de período: ")?;
    let period_id = prompt("Id del período (ej: 2026-W02): ")?;

    let client = reqwest::Client::new();
    let response = client
        .get(format!(
            "{}/api/insights/{}/{}",
            base_url, period_type, period_id
        ))
        .send()
        .await?;

    let status = response.status();
    let payload: serde_json::Value = response.json().await?;

    if status.is_success() {
        println!("{}", "✅ Documento:".bright_green());
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{} {}", "❌ No encontrado:".bright_red(), status);
    }
    Ok(())
}

async fn recent_reports(base_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("{}", "🕒 REPORTES RECIENTES".bright_green().bold());

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/insights/recent?limit=10", base_url))
        .send()
        .await?;

    let documents: serde_json::Value = response.json().await?;
    if let Some(list) = documents.as_array() {
        if list.is_empty() {
            println!("{}", "(sin reportes todavía)".bright_yellow());
        }
        for doc in list {
            println!(
                "- {} | {} | {} insights",
                doc["id"].as_str().unwrap_or("?").bright_white(),
                doc["display_label"].as_str().unwrap_or("?"),
                doc["insights"].as_array().map(|a| a.len()).unwrap_or(0)
            );
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&documents)?);
    }
    Ok(())
}
