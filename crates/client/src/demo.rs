//! Scripted four-phase walkthrough of the provisioning workflow.
//!
//! 1. Submit three requests from different teams.
//! 2. List the pending queue.
//! 3. Approve the first two requests, reject the third.
//! 4. Show the provisioned inventory with its monthly cost.

use std::io::Write;
use std::time::Duration;

use uuid::Uuid;

use dbprov_core::provisioning::{ApprovalAction, DbSize, DbType, Environment, RequestStatus};

use crate::api::{ClientError, ProvisioningClient};
use crate::models::{Decision, NewRequest};

const RULE_WIDTH: usize = 80;

/// Approver recorded for the approvals in phase 3.
pub const APPROVER: &str = "john.doe@company.com";

/// Approver recorded for the rejection in phase 3.
pub const REJECTER: &str = "jane.smith@company.com";

/// The three requests submitted in phase 1.
pub fn sample_requests() -> Vec<NewRequest> {
    vec![
        NewRequest {
            team_name: "data-engineering".into(),
            db_type: DbType::Postgres,
            environment: Environment::Prod,
            size: DbSize::Large,
            purpose: "Analytics warehouse".into(),
        },
        NewRequest {
            team_name: "backend-team".into(),
            db_type: DbType::Mysql,
            environment: Environment::Dev,
            size: DbSize::Small,
            purpose: "Development testing".into(),
        },
        NewRequest {
            team_name: "cache-team".into(),
            db_type: DbType::Redis,
            environment: Environment::Staging,
            size: DbSize::Medium,
            purpose: "Session caching".into(),
        },
    ]
}

/// What the demo observed, for callers that want more than the printout.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoSummary {
    pub submitted: Vec<Uuid>,
    pub pending_seen: usize,
    pub approved: usize,
    pub rejected: usize,
    pub databases: usize,
    pub total_monthly_cost: f64,
}

/// Drives the walkthrough against a live API, printing to `out`.
pub struct Demo<'a, W: Write> {
    client: &'a ProvisioningClient,
    phase_pause: Duration,
    out: W,
}

impl<'a, W: Write> Demo<'a, W> {
    pub fn new(client: &'a ProvisioningClient, phase_pause: Duration, out: W) -> Self {
        Self {
            client,
            phase_pause,
            out,
        }
    }

    /// Run all four phases. Any API failure aborts the walkthrough.
    pub async fn run(mut self) -> Result<DemoSummary, ClientError> {
        self.banner("SELF-SERVICE DB PROVISIONING - DEMO")?;

        let submitted = self.submit_phase().await?;
        self.pause().await;

        let pending_seen = self.pending_phase().await?;
        self.pause().await;

        let (approved, rejected) = self.approval_phase(&submitted).await?;
        self.pause().await;

        let (databases, total_monthly_cost) = self.inventory_phase().await?;

        self.banner("DEMO COMPLETE")?;

        Ok(DemoSummary {
            submitted,
            pending_seen,
            approved,
            rejected,
            databases,
            total_monthly_cost,
        })
    }

    async fn submit_phase(&mut self) -> Result<Vec<Uuid>, ClientError> {
        self.heading("PHASE 1: Submit Database Requests")?;

        let mut ids = Vec::new();
        for request in sample_requests() {
            let outcome = self.client.create_request(&request).await?;
            writeln!(
                self.out,
                "  Created: {} - {} ({})",
                request.team_name, request.db_type, request.size
            )?;
            writeln!(self.out, "    Request ID: {}", outcome.request_id)?;
            tracing::debug!(request_id = %outcome.request_id, team = %request.team_name, "Submitted");
            ids.push(outcome.request_id);
        }
        Ok(ids)
    }

    async fn pending_phase(&mut self) -> Result<usize, ClientError> {
        self.heading("PHASE 2: View Pending Requests")?;

        let pending = self
            .client
            .list_requests(Some(RequestStatus::Pending))
            .await?
            .requests;
        writeln!(self.out, "  Pending requests: {}", pending.len())?;
        for request in &pending {
            writeln!(
                self.out,
                "    {}: {} ({})",
                request.team_name, request.db_type, request.environment
            )?;
        }
        Ok(pending.len())
    }

    async fn approval_phase(&mut self, ids: &[Uuid]) -> Result<(usize, usize), ClientError> {
        self.heading("PHASE 3: Approve Requests")?;

        let (to_approve, to_reject) = ids.split_at(ids.len().min(2));

        for id in to_approve {
            let outcome = self
                .client
                .process_approval(&Decision {
                    request_id: *id,
                    action: ApprovalAction::Approve,
                    approver: APPROVER.into(),
                    notes: Some("Approved - meets requirements".into()),
                })
                .await?;
            writeln!(self.out, "  Approved: {}... - {}", short_id(id), outcome.status)?;
        }

        for id in to_reject {
            self.client
                .process_approval(&Decision {
                    request_id: *id,
                    action: ApprovalAction::Reject,
                    approver: REJECTER.into(),
                    notes: Some("Insufficient justification".into()),
                })
                .await?;
            writeln!(self.out, "  Rejected: {}...", short_id(id))?;
        }

        Ok((to_approve.len(), to_reject.len()))
    }

    async fn inventory_phase(&mut self) -> Result<(usize, f64), ClientError> {
        self.heading("PHASE 4: View Provisioned Databases")?;

        let inventory = self.client.list_databases().await?;
        writeln!(self.out, "  Total databases: {}", inventory.total_count)?;
        writeln!(
            self.out,
            "  Total monthly cost: ${:.2}",
            inventory.total_monthly_cost
        )?;
        writeln!(self.out, "\n  Databases:")?;
        for db in &inventory.databases {
            writeln!(self.out, "    {}", db.db_name)?;
            writeln!(
                self.out,
                "      Type: {} | Env: {}",
                db.db_type, db.environment
            )?;
            writeln!(
                self.out,
                "      Cost: ${:.2}/month",
                db.estimated_monthly_cost
            )?;
            writeln!(self.out, "      Connection: {}:{}", db.host, db.port)?;
        }
        Ok((inventory.total_count, inventory.total_monthly_cost))
    }

    fn banner(&mut self, title: &str) -> std::io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.out, "\n{rule}\n{title}\n{rule}")
    }

    fn heading(&mut self, title: &str) -> std::io::Result<()> {
        writeln!(self.out, "\n{title}\n{}", "-".repeat(RULE_WIDTH))
    }

    async fn pause(&self) {
        if !self.phase_pause.is_zero() {
            tokio::time::sleep(self.phase_pause).await;
        }
    }
}

/// First eight characters of a request id, as shown in the approval phase.
fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
