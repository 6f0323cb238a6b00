use anyhow::Result;
use clap::Subcommand;
use testops_application::CopilotUseCase;
use testops_core::test_plan::{NewTestPlan, PlanPriority, PlanStatus, TestPlanUpdate};

#[derive(Subcommand)]
pub enum PlanAction {
    List {
        /// Case-insensitive filter on name or description
        #[arg(long)]
        search: Option<String>,
    },
    Create {
        name: String,
        #[arg(long)]
        product: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "medium")]
        priority: PlanPriority,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<PlanPriority>,
        #[arg(long)]
        status: Option<PlanStatus>,
    },
    Delete {
        id: String,
    },
    Run {
        id: String,
    },
}

pub async fn run(app: &CopilotUseCase, action: PlanAction) -> Result<()> {
    match action {
        PlanAction::List { search } => {
            let plans = app.load_test_plans().await;
            for plan in plans
                .iter()
                .filter(|plan| search.as_deref().is_none_or(|q| plan.matches(q)))
            {
                println!(
                    "{:<8} {:<40} {:<18} {:>4} cases {:>5.1}%  {} / {}",
                    plan.id,
                    plan.name,
                    plan.product,
                    plan.test_cases,
                    plan.coverage,
                    plan.priority,
                    plan.status
                );
            }
        }
        PlanAction::Create {
            name,
            product,
            description,
            priority,
        } => {
            let plan = app
                .create_test_plan(&NewTestPlan {
                    name,
                    description,
                    product,
                    priority,
                })
                .await?;
            println!("Created {} ({})", plan.name, plan.id);
        }
        PlanAction::Update {
            id,
            name,
            description,
            priority,
            status,
        } => {
            let update = TestPlanUpdate {
                name,
                description,
                priority,
                status,
            };
            let plan = app.update_test_plan(&id, &update).await?;
            println!("Updated {} ({})", plan.name, plan.id);
        }
        PlanAction::Delete { id } => {
            app.delete_test_plan(&id).await?;
            println!("Deleted {}", id);
        }
        PlanAction::Run { id } => {
            let run = app.run_test_plan(&id).await?;
            println!("Run {} of {}: {}", run.run_id, run.plan_id, run.status);
        }
    }
    Ok(())
}
