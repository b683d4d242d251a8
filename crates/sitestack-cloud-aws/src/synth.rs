//! CloudFormation synthesis
//!
//! [`CfnSynthesizer`] answers every platform call by adding resources to a
//! template and returning handles whose attributes are CloudFormation
//! intrinsics (`Ref`, `Fn::GetAtt`), so later steps reference earlier
//! resources the way CloudFormation expects.

use crate::error::{AwsError, Result};
use crate::template::{
    Template, TemplateOutput, TemplateParameter, TemplateResource, get_att, join, reference,
};
use crate::zones::ZoneLookup;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use sitestack_cloud::{
    AccessIdentityParams, BucketParams, BucketPolicyParams, CertificateParams, CloudPlatform,
    ContentDeploymentParams, DistributionParams, DnsRecordParams, ProvisionError,
    ProvisionedResource, RedirectBucketParams, StepKind, ZoneLookupParams,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Hosted zone id CloudFront uses for every distribution alias target
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

const CERTIFICATE_STACK_SUFFIX: &str = "-certificate";
const CERTIFICATE_ARN_PARAMETER: &str = "CertificateArn";
const ORIGIN_ID: &str = "S3Origin";

mod logical_id {
    pub const BUCKET: &str = "S3Bucket";
    pub const PUBLIC_READ_POLICY: &str = "S3BucketPublicReadPolicy";
    pub const REDIRECT_BUCKET: &str = "S3RedirectBucket";
    pub const CERTIFICATE: &str = "Certificate";
    pub const ACCESS_IDENTITY: &str = "OriginAccessIdentity";
    pub const BUCKET_POLICY: &str = "S3BucketPolicy";
    pub const DISTRIBUTION: &str = "CloudFrontDistribution";
    pub const ALIAS_RECORD: &str = "AliasRecord";
    pub const DEPLOYMENT: &str = "S3BucketDeployment";
}

/// One synthesized stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackTemplate {
    pub name: String,

    /// Region the stack must be deployed to. `None` leaves it to the caller.
    pub region: Option<String>,

    pub template: Template,
}

/// Local content to upload once the stacks are deployed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetUpload {
    pub source: PathBuf,
    pub destination_bucket: String,

    /// Distribution whose cache is invalidated after the upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalidation_paths: Vec<String>,
}

/// Result of a synthesis run, stacks in deployment order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    pub stacks: Vec<StackTemplate>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetUpload>,
}

impl Synthesis {
    pub fn stack(&self, name: &str) -> Option<&StackTemplate> {
        self.stacks.iter().find(|s| s.name == name)
    }
}

#[derive(Debug)]
struct SynthState {
    main: Template,
    /// Stack holding the certificate when it cannot live in the main stack
    certificate: Option<CertificateStack>,
    assets: Vec<AssetUpload>,
}

#[derive(Debug)]
struct CertificateStack {
    region: String,
    template: Template,
}

/// [`CloudPlatform`] that writes CloudFormation templates
pub struct CfnSynthesizer {
    stack_name: String,
    stack_region: Option<String>,
    zones: Box<dyn ZoneLookup>,
    state: Mutex<SynthState>,
}

impl CfnSynthesizer {
    pub fn new(
        stack_name: impl Into<String>,
        stack_region: Option<String>,
        zones: impl ZoneLookup + 'static,
    ) -> Self {
        let stack_name = stack_name.into();
        Self {
            state: Mutex::new(SynthState {
                main: Template::new(format!("Static website stack {stack_name}")),
                certificate: None,
                assets: Vec::new(),
            }),
            stack_name,
            stack_region,
            zones: Box::new(zones),
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    fn certificate_stack_name(&self) -> String {
        format!("{}{}", self.stack_name, CERTIFICATE_STACK_SUFFIX)
    }

    /// Consume the synthesizer and return the stacks in deployment order
    pub fn finish(self) -> Synthesis {
        let certificate_stack = self.certificate_stack_name();
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(|e| e.into_inner());

        let mut stacks = Vec::new();
        if let Some(cert) = state.certificate {
            stacks.push(StackTemplate {
                name: certificate_stack,
                region: Some(cert.region),
                template: cert.template,
            });
        }
        stacks.push(StackTemplate {
            name: self.stack_name,
            region: self.stack_region,
            template: state.main,
        });

        Synthesis {
            stacks,
            assets: state.assets,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SynthState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn add_resource(&self, logical_id: &str, resource: TemplateResource) -> Result<()> {
        let mut state = self.lock();
        add_to(&mut state.main, logical_id, resource)
    }

    fn add_output(&self, name: &str, output: TemplateOutput) {
        self.lock().main.outputs.insert(name.to_string(), output);
    }
}

fn add_to(template: &mut Template, logical_id: &str, resource: TemplateResource) -> Result<()> {
    if template.resources.contains_key(logical_id) {
        return Err(AwsError::DuplicateResource(logical_id.to_string()));
    }
    template.resources.insert(logical_id.to_string(), resource);
    Ok(())
}

fn attribute(resource: &ProvisionedResource, key: &str) -> Result<Value> {
    resource
        .attribute(key)
        .cloned()
        .ok_or_else(|| AwsError::MissingAttribute {
            resource: format!("{} {}", resource.kind, resource.id),
            attribute: key.to_string(),
        })
}

fn website_url_output(logical: &str) -> TemplateOutput {
    TemplateOutput::new(get_att(logical, "WebsiteURL"), "Public website endpoint")
}

#[async_trait]
impl CloudPlatform for CfnSynthesizer {
    fn name(&self) -> &str {
        "aws-cloudformation"
    }

    async fn create_storage_container(
        &self,
        params: &BucketParams,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let id = logical_id::BUCKET;
        let mut properties = json!({
            "BucketName": params.name,
            "WebsiteConfiguration": {
                "IndexDocument": params.index_document,
                "ErrorDocument": params.error_document,
            },
        });
        if params.encrypted {
            properties["BucketEncryption"] = json!({
                "ServerSideEncryptionConfiguration": [
                    { "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" } }
                ]
            });
        }
        if params.public_read {
            properties["PublicAccessBlockConfiguration"] = json!({
                "BlockPublicAcls": false,
                "BlockPublicPolicy": false,
                "IgnorePublicAcls": false,
                "RestrictPublicBuckets": false,
            });
        }
        self.add_resource(id, TemplateResource::new("AWS::S3::Bucket", properties))?;

        if params.public_read {
            let policy = json!({
                "Bucket": reference(id),
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": "*",
                        "Action": ["s3:GetObject"],
                        "Resource": join(vec![get_att(id, "Arn"), json!("/*")]),
                    }],
                },
            });
            self.add_resource(
                logical_id::PUBLIC_READ_POLICY,
                TemplateResource::new("AWS::S3::BucketPolicy", policy),
            )?;
            self.add_output("WebsiteURL", website_url_output(id));
        }
        self.add_output(
            "BucketName",
            TemplateOutput::new(reference(id), "Bucket holding the site content"),
        );

        let mut handle = ProvisionedResource::new(StepKind::Bucket, id)
            .with_attribute("bucket_name", json!(params.name))
            .with_attribute("ref", reference(id))
            .with_attribute("arn", get_att(id, "Arn"))
            .with_attribute("regional_domain_name", get_att(id, "RegionalDomainName"));
        if let Some(region) = &params.region {
            handle = handle.with_attribute("region", json!(region));
        }
        Ok(handle)
    }

    async fn create_redirect_container(
        &self,
        params: &RedirectBucketParams,
        target: &ProvisionedResource,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let id = logical_id::REDIRECT_BUCKET;
        let properties = json!({
            "BucketName": params.name,
            "WebsiteConfiguration": {
                "IndexDocument": params.index_document,
                "RoutingRules": [{
                    "RedirectRule": {
                        "HostName": params.redirect_host,
                        "HttpRedirectCode": params.status_code.to_string(),
                        "Protocol": params.protocol,
                    }
                }],
            },
        });
        self.add_resource(
            id,
            TemplateResource::new("AWS::S3::Bucket", properties).depends_on(target.id.clone()),
        )?;

        Ok(ProvisionedResource::new(StepKind::RedirectBucket, id)
            .with_attribute("bucket_name", json!(params.name))
            .with_attribute("ref", reference(id)))
    }

    async fn create_access_identity(
        &self,
        params: &AccessIdentityParams,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let id = logical_id::ACCESS_IDENTITY;
        self.add_resource(
            id,
            TemplateResource::new(
                "AWS::CloudFront::CloudFrontOriginAccessIdentity",
                json!({ "CloudFrontOriginAccessIdentityConfig": { "Comment": params.comment } }),
            ),
        )?;

        Ok(ProvisionedResource::new(StepKind::AccessIdentity, id)
            .with_attribute("ref", reference(id))
            .with_attribute("s3_canonical_user_id", get_att(id, "S3CanonicalUserId")))
    }

    async fn attach_read_policy(
        &self,
        params: &BucketPolicyParams,
        container: &ProvisionedResource,
        principal: &ProvisionedResource,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let id = logical_id::BUCKET_POLICY;
        let properties = json!({
            "Bucket": attribute(container, "ref")?,
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": params.actions,
                    "Resource": join(vec![
                        attribute(container, "arn")?,
                        json!(format!("/{}", params.object_pattern)),
                    ]),
                    "Principal": { "CanonicalUser": attribute(principal, "s3_canonical_user_id")? },
                }],
            },
        });
        self.add_resource(
            id,
            TemplateResource::new("AWS::S3::BucketPolicy", properties),
        )?;

        Ok(ProvisionedResource::new(StepKind::BucketPolicy, id))
    }

    async fn create_cdn_distribution(
        &self,
        params: &DistributionParams,
        origin: &ProvisionedResource,
        access_identity: &ProvisionedResource,
        certificate: Option<&ProvisionedResource>,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let id = logical_id::DISTRIBUTION;

        let viewer_certificate = match certificate {
            Some(cert) => json!({
                "AcmCertificateArn": attribute(cert, "arn")?,
                "SslSupportMethod": "sni-only",
                "MinimumProtocolVersion": "TLSv1.2_2021",
            }),
            None if !params.aliases.is_empty() => {
                return Err(ProvisionError::InvalidConfig(format!(
                    "distribution aliases {} need a certificate",
                    params.aliases.join(", ")
                )));
            }
            None => json!({ "CloudFrontDefaultCertificate": true }),
        };

        let error_responses: Vec<Value> = params
            .error_responses
            .iter()
            .map(|r| {
                json!({
                    "ErrorCode": r.error_code,
                    "ResponseCode": r.response_code,
                    "ResponsePagePath": r.response_page_path,
                })
            })
            .collect();

        let mut config = json!({
            "Enabled": true,
            "DefaultRootObject": params.default_root_object,
            "Origins": [{
                "Id": ORIGIN_ID,
                "DomainName": attribute(origin, "regional_domain_name")?,
                "S3OriginConfig": {
                    "OriginAccessIdentity": join(vec![
                        json!("origin-access-identity/cloudfront/"),
                        attribute(access_identity, "ref")?,
                    ]),
                },
            }],
            "DefaultCacheBehavior": {
                "TargetOriginId": ORIGIN_ID,
                "ViewerProtocolPolicy": params.viewer_protocol_policy.to_string(),
                "AllowedMethods": params.allowed_methods.methods(),
                "CachedMethods": ["GET", "HEAD"],
                "Compress": params.compress,
                "ForwardedValues": { "QueryString": false, "Cookies": { "Forward": "none" } },
            },
            "CustomErrorResponses": error_responses,
            "ViewerCertificate": viewer_certificate,
        });
        if !params.aliases.is_empty() {
            config["Aliases"] = json!(params.aliases);
        }

        let mut resource = TemplateResource::new(
            "AWS::CloudFront::Distribution",
            json!({ "DistributionConfig": config }),
        );
        // The policy must exist before CloudFront first reads the bucket
        if self.lock().main.resources.contains_key(logical_id::BUCKET_POLICY) {
            resource = resource.depends_on(logical_id::BUCKET_POLICY);
        }
        self.add_resource(id, resource)?;

        self.add_output(
            "DistributionDomainName",
            TemplateOutput::new(get_att(id, "DomainName"), "CloudFront domain name"),
        );
        let site_url = match params.aliases.first() {
            Some(alias) => json!(format!("https://{alias}")),
            None => join(vec![json!("https://"), get_att(id, "DomainName")]),
        };
        self.add_output("SiteUrl", TemplateOutput::new(site_url, "Website URL"));

        Ok(ProvisionedResource::new(StepKind::Distribution, id)
            .with_attribute("ref", reference(id))
            .with_attribute("domain_name", get_att(id, "DomainName"))
            .with_attribute("aliases", json!(params.aliases)))
    }

    async fn lookup_existing_dns_zone(
        &self,
        params: &ZoneLookupParams,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let zone = self
            .zones
            .find_zone(&params.domain_name)
            .await?
            .ok_or_else(|| ProvisionError::ZoneNotFound(params.domain_name.clone()))?;

        tracing::debug!(zone = %zone.name, id = %zone.id, "Resolved hosted zone");
        Ok(ProvisionedResource::new(StepKind::HostedZoneLookup, zone.id.clone())
            .with_attribute("zone_id", json!(zone.id))
            .with_attribute("zone_name", json!(zone.name)))
    }

    async fn request_certificate(
        &self,
        params: &CertificateParams,
        zone: &ProvisionedResource,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let id = logical_id::CERTIFICATE;
        let zone_id = attribute(zone, "zone_id")?;

        let validation_options: Vec<Value> = std::iter::once(&params.domain_name)
            .chain(params.alternative_names.iter())
            .map(|name| json!({ "DomainName": name, "HostedZoneId": zone_id }))
            .collect();
        let properties = json!({
            "DomainName": params.domain_name,
            "SubjectAlternativeNames": params.alternative_names,
            "ValidationMethod": "DNS",
            "DomainValidationOptions": validation_options,
        });
        let resource = TemplateResource::new("AWS::CertificateManager::Certificate", properties);

        let same_region = self
            .stack_region
            .as_deref()
            .is_some_and(|region| region.eq_ignore_ascii_case(&params.region));
        let arn = if same_region {
            self.add_resource(id, resource)?;
            reference(id)
        } else {
            // CloudFormation cannot reference across regions: the certificate
            // gets its own stack and its ARN is passed in as a parameter.
            tracing::info!(
                region = %params.region,
                stack = %self.certificate_stack_name(),
                "Certificate is synthesized into a separate stack"
            );
            let mut state = self.lock();
            let cert = state.certificate.get_or_insert_with(|| CertificateStack {
                region: params.region.clone(),
                template: Template::new(format!(
                    "Certificate for static website stack {}",
                    self.stack_name
                )),
            });
            add_to(&mut cert.template, id, resource)?;
            cert.template.outputs.insert(
                CERTIFICATE_ARN_PARAMETER.to_string(),
                TemplateOutput::new(reference(id), "Certificate ARN for the site stack"),
            );
            state.main.parameters.insert(
                CERTIFICATE_ARN_PARAMETER.to_string(),
                TemplateParameter {
                    parameter_type: "String".to_string(),
                    description: Some(format!(
                        "ARN of the certificate from stack {} ({})",
                        self.certificate_stack_name(),
                        params.region
                    )),
                },
            );
            reference(CERTIFICATE_ARN_PARAMETER)
        };

        Ok(ProvisionedResource::new(StepKind::Certificate, id)
            .with_attribute("arn", arn)
            .with_attribute("region", json!(params.region)))
    }

    async fn create_dns_alias_record(
        &self,
        params: &DnsRecordParams,
        zone: &ProvisionedResource,
        target: &ProvisionedResource,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let id = logical_id::ALIAS_RECORD;
        let properties = json!({
            "HostedZoneId": attribute(zone, "zone_id")?,
            "Name": format!("{}.", params.record_name),
            "Type": params.record_type,
            "AliasTarget": {
                "DNSName": attribute(target, "domain_name")?,
                "HostedZoneId": CLOUDFRONT_HOSTED_ZONE_ID,
            },
        });
        self.add_resource(
            id,
            TemplateResource::new("AWS::Route53::RecordSet", properties),
        )?;

        Ok(ProvisionedResource::new(StepKind::DnsRecord, id)
            .with_attribute("record_name", json!(params.record_name)))
    }

    async fn upload_content(
        &self,
        params: &ContentDeploymentParams,
        container: &ProvisionedResource,
        distribution: Option<&ProvisionedResource>,
    ) -> sitestack_cloud::Result<ProvisionedResource> {
        let is_dir = tokio::fs::metadata(&params.source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(AwsError::SourceNotFound(params.source.clone()).into());
        }

        let destination_bucket = container
            .get_attribute::<String>("bucket_name")
            .ok_or_else(|| AwsError::MissingAttribute {
                resource: format!("{} {}", container.kind, container.id),
                attribute: "bucket_name".to_string(),
            })?;
        let distribution = distribution.map(|d| attribute(d, "ref")).transpose()?;

        self.lock().assets.push(AssetUpload {
            source: params.source.clone(),
            destination_bucket: destination_bucket.clone(),
            distribution,
            invalidation_paths: params.invalidation_paths.clone(),
        });

        Ok(
            ProvisionedResource::new(StepKind::ContentDeployment, logical_id::DEPLOYMENT)
                .with_attribute("source", json!(params.source))
                .with_attribute("destination_bucket", json!(destination_bucket)),
        )
    }
}
