//! Cloud providers and their approved service lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DesignError;

/// Supported cloud providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudProvider {
    Aws,
    Gcp,
}

const AWS_APPROVED_SERVICES: &[&str] = &[
    // Compute
    "EC2", "Lambda", "ECS", "EKS", "Fargate", "Batch", "Lightsail",
    // Storage
    "S3", "EBS", "EFS", "FSx", "Storage Gateway",
    // Database
    "RDS", "DynamoDB", "ElastiCache", "Neptune", "Redshift", "DocumentDB", "QLDB", "Keyspaces",
    "Timestream",
    // Networking
    "VPC", "CloudFront", "Route 53", "API Gateway", "Direct Connect", "Transit Gateway",
    "App Mesh", "Global Accelerator",
    // Security
    "IAM", "Cognito", "Secrets Manager", "GuardDuty", "Inspector", "CloudTrail", "Shield", "WAF",
    "KMS", "Certificate Manager",
    // Analytics
    "Athena", "EMR", "CloudSearch", "Elasticsearch Service", "Kinesis", "QuickSight",
    "Data Pipeline", "Glue", "Lake Formation",
    // Integration
    "SQS", "SNS", "EventBridge", "MQ", "SES", "Step Functions",
    // Management
    "CloudWatch", "CloudFormation", "Systems Manager", "Control Tower", "Config", "OpsWorks",
    "Service Catalog", "Trusted Advisor",
    // Containers
    "ECR", "App Runner",
    // Developer tools
    "CodeCommit", "CodeBuild", "CodeDeploy", "CodePipeline", "CodeStar", "Cloud9", "X-Ray",
    // Machine learning
    "SageMaker", "Comprehend", "Translate", "Rekognition", "Polly", "Lex", "Personalize",
];

const GCP_APPROVED_SERVICES: &[&str] = &[
    // Compute
    "Compute Engine", "App Engine", "Google Kubernetes Engine (GKE)", "Cloud Run",
    "Cloud Functions",
    // Storage
    "Cloud Storage", "Persistent Disk", "Filestore",
    // Database
    "Cloud SQL", "Cloud Spanner", "Firestore", "Cloud Bigtable", "Memorystore",
    "Cloud Datastore",
    // Networking
    "Virtual Private Cloud (VPC)", "Cloud Load Balancing", "Cloud CDN", "Cloud DNS",
    "Cloud Interconnect", "Cloud VPN",
    // Security
    "Cloud IAM", "Cloud Identity", "Resource Manager", "Secret Manager", "Cloud KMS",
    "Security Command Center",
    // Big data
    "BigQuery", "Dataflow", "Dataproc", "Pub/Sub", "Data Fusion", "Cloud Composer",
    "Cloud Data Catalog",
    // AI and machine learning
    "Vertex AI", "Vision AI", "Natural Language AI", "Translation AI", "Speech-to-Text",
    "Text-to-Speech", "Dialogflow",
    // Management
    "Cloud Monitoring", "Cloud Logging", "Cloud Trace", "Cloud Deployment Manager",
    "Cloud Endpoints",
    // Developer tools
    "Cloud Build", "Cloud Source Repositories", "Container Registry", "Artifact Registry",
    "Cloud Scheduler",
    // Migration
    "Transfer Service", "Database Migration Service", "Migrate for Compute Engine",
    // API management
    "API Gateway", "Apigee API Management",
];

impl CloudProvider {
    /// Uppercase identifier used in prompts and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Gcp => "GCP",
        }
    }

    /// Ordered, duplicate-free approved service names.
    pub fn approved_services(&self) -> &'static [&'static str] {
        match self {
            CloudProvider::Aws => AWS_APPROVED_SERVICES,
            CloudProvider::Gcp => GCP_APPROVED_SERVICES,
        }
    }

    /// Approved services joined with `", "` for prompt interpolation.
    pub fn approved_services_csv(&self) -> String {
        self.approved_services().join(", ")
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(CloudProvider::Aws),
            "gcp" => Ok(CloudProvider::Gcp),
            _ => Err(DesignError::UnsupportedProvider(s.to_string())),
        }
    }
}
