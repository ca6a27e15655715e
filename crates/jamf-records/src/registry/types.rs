//! The built-in Classic API record types.

use super::rules::{Literal, SaveRule};
use super::stub::{FieldDefault, FieldSpec, RandomKind};
use super::{CreateTarget, TypeSpec};

const NAME: RandomKind = RandomKind::Name;

pub const TYPES: &[TypeSpec] = &[
    TypeSpec::new(
        "AdvancedComputerSearches",
        "advanced_computer_search",
        "advanced_computer_searches",
        "advancedcomputersearches",
    )
    .fields(&[
        FieldSpec::new("criteria", FieldDefault::EmptyList),
        FieldSpec::new("display_fields", FieldDefault::EmptyList),
        FieldSpec::text("sort_1", ""),
        FieldSpec::text("sort_2", ""),
        FieldSpec::text("sort_3", ""),
        FieldSpec::text("view_as", "Standard Web Page"),
    ]),
    TypeSpec::new(
        "AdvancedMobileDeviceSearches",
        "advanced_mobile_device_search",
        "advanced_mobile_device_searches",
        "advancedmobiledevicesearches",
    ),
    TypeSpec::new(
        "AdvancedUserSearches",
        "advanced_user_search",
        "advanced_user_searches",
        "advancedusersearches",
    ),
    TypeSpec::new("Buildings", "building", "buildings", "buildings"),
    TypeSpec::new("BYOProfiles", "byo_profile", "byoprofiles", "byoprofiles").no_delete(),
    TypeSpec::new("Categories", "category", "categories", "categories"),
    TypeSpec::new("Classes", "class", "classes", "classes"),
    TypeSpec::new("Computers", "computer", "computers", "computers")
        .general_name()
        .arrays(&["hardware/storage", "extension_attributes"]),
    TypeSpec::new(
        "ComputerExtensionAttributes",
        "computer_extension_attribute",
        "computer_extension_attributes",
        "computerextensionattributes",
    )
    .save_rules(&[SaveRule::DropIf {
        path: "inventory_display",
        value: Literal::Text(""),
    }]),
    TypeSpec::new(
        "ComputerGroups",
        "computer_group",
        "computer_groups",
        "computergroups",
    )
    .fields(&[FieldSpec::new("is_smart", FieldDefault::Bool(true))]),
    TypeSpec::new(
        "ComputerReports",
        "computer_reports",
        "computer_reports",
        "computerreports",
    )
    .read_only(),
    TypeSpec::new("Departments", "department", "departments", "departments"),
    TypeSpec::new(
        "DirectoryBindings",
        "directory_binding",
        "directory_bindings",
        "directorybindings",
    )
    .fields(&[FieldSpec::text("type", "Active Directory")]),
    TypeSpec::new(
        "DiskEncryptionConfigurations",
        "disk_encryption_configuration",
        "disk_encryption_configurations",
        "diskencryptionconfigurations",
    ),
    TypeSpec::new(
        "DistributionPoints",
        "distribution_point",
        "distribution_points",
        "distributionpoints",
    )
    .fields(&[
        FieldSpec::text("read_only_password_sha256", "********************"),
        FieldSpec::random("read_only_username", NAME),
        FieldSpec::text("read_write_password_sha256", "********************"),
        FieldSpec::random("read_write_username", NAME),
        FieldSpec::random("share_name", NAME),
    ])
    .responds_with(&["file_share_distribution_point"]),
    TypeSpec::new("DockItems", "dock_item", "dock_items", "dockitems").fields(&[
        FieldSpec::text("path", "/"),
        FieldSpec::text("type", "Folder"),
    ]),
    TypeSpec::new("Ebooks", "ebook", "ebooks", "ebooks")
        .general_name()
        .save_rules(&[SaveRule::DropIf {
            path: "general/url",
            value: Literal::Text(""),
        }]),
    TypeSpec::new("Ibeacons", "ibeacon", "ibeacons", "ibeacons")
        .fields(&[FieldSpec::random("uuid", RandomKind::Uuid)]),
    TypeSpec::new(
        "JSONWebTokenConfigurations",
        "json_web_token_configuration",
        "json_web_token_configurations",
        "jsonwebtokenconfigurations",
    )
    .fields(&[
        FieldSpec::random("encryption_key", NAME),
        FieldSpec::new("token_expiry", FieldDefault::Int(1)),
    ])
    .save_rules(&[SaveRule::DropIf {
        path: "token_expiry",
        value: Literal::Int(0),
    }]),
    TypeSpec::new("LDAPServers", "ldap_server", "ldap_servers", "ldapservers"),
    TypeSpec::new(
        "MacApplications",
        "mac_application",
        "mac_applications",
        "macapplications",
    )
    .general_name()
    .fields(&[
        FieldSpec::random("general/version", RandomKind::SemVer),
        FieldSpec::text("general/bundle_id", "edu.utah"),
        FieldSpec::text("general/url", "https://www.apple.com"),
    ]),
    TypeSpec::new(
        "ManagedPreferenceProfiles",
        "managed_preference_profile",
        "managed_preference_profiles",
        "managedpreferenceprofiles",
    )
    .no_create(),
    TypeSpec::new(
        "MobileDevices",
        "mobile_device",
        "mobile_devices",
        "mobiledevices",
    )
    .general_name()
    .fields(&[
        FieldSpec::random("general/udid", RandomKind::Uuid),
        FieldSpec::random("general/serial_number", RandomKind::SerialNumber),
    ]),
    TypeSpec::new(
        "MobileDeviceApplications",
        "mobile_device_application",
        "mobile_device_applications",
        "mobiledeviceapplications",
    )
    .general_name()
    .fields(&[
        FieldSpec::random("general/version", RandomKind::SemVer),
        FieldSpec::text("general/bundle_id", "utah.edu"),
        FieldSpec::text("general/os_type", "iOS"),
    ])
    .save_rules(&[SaveRule::DefaultIfMissing {
        path: "general/os_type",
        value: "iOS",
    }]),
    TypeSpec::new(
        "MobileDeviceCommands",
        "mobile_device_command",
        "mobile_device_commands",
        "mobiledevicecommands",
    )
    .server_named()
    .fields(&[FieldSpec::required("general/command")])
    .no_update()
    .no_delete(),
    TypeSpec::new(
        "MobileDeviceConfigurationProfiles",
        "configuration_profile",
        "configuration_profiles",
        "mobiledeviceconfigurationprofiles",
    )
    .general_name(),
    TypeSpec::new(
        "MobileDeviceEnrollmentProfiles",
        "mobile_device_enrollment_profile",
        "mobile_device_enrollment_profiles",
        "mobiledeviceenrollmentprofiles",
    )
    .general_name(),
    TypeSpec::new(
        "MobileDeviceExtensionAttributes",
        "mobile_device_extension_attribute",
        "mobile_device_extension_attributes",
        "mobiledeviceextensionattributes",
    ),
    TypeSpec::new(
        "MobileDeviceInvitations",
        "mobile_device_invitation",
        "mobile_device_invitations",
        "mobiledeviceinvitations",
    )
    .listing_name("invitation")
    .server_named()
    .fields(&[FieldSpec::text("invitation_type", "USER_INITIATED_EMAIL")])
    .no_update(),
    TypeSpec::new(
        "MobileDeviceProvisioningProfiles",
        "mobile_device_provisioning_profile",
        "mobile_device_provisioning_profiles",
        "mobiledeviceprovisioningprofiles",
    )
    .fields(&[
        FieldSpec::random("general/display_name", NAME),
        FieldSpec::random("general/uuid", RandomKind::Uuid),
        FieldSpec::random("general/profile/name", NAME),
        FieldSpec::required("general/profile/data"),
    ])
    .create_at(CreateTarget::IdZero),
    TypeSpec::new(
        "NetworkSegments",
        "network_segment",
        "network_segments",
        "networksegments",
    )
    .fields(&[
        FieldSpec::text("ending_address", "10.0.0.255"),
        FieldSpec::text("starting_address", "10.0.0.1"),
    ]),
    TypeSpec::new(
        "OSXConfigurationProfiles",
        "os_x_configuration_profile",
        "os_x_configuration_profiles",
        "osxconfigurationprofiles",
    )
    .general_name(),
    TypeSpec::new("Packages", "package", "packages", "packages")
        .fields(&[FieldSpec::new("filename", FieldDefault::CopyOf("name"))])
        .save_rules(&[SaveRule::DropIf {
            path: "category",
            value: Literal::Text("No category assigned"),
        }]),
    TypeSpec::new(
        "PatchExternalSources",
        "patch_external_source",
        "patch_external_sources",
        "patchexternalsources",
    )
    .create_at(CreateTarget::IdZero),
    TypeSpec::new(
        "PatchInternalSources",
        "patch_internal_source",
        "patch_internal_sources",
        "patchinternalsources",
    )
    .read_only(),
    TypeSpec::new(
        "PatchPolicies",
        "patch_policy",
        "patch_policies",
        "patchpolicies",
    )
    .general_name()
    .fields(&[FieldSpec::new(
        "software_title_configuration_id",
        FieldDefault::Int(1),
    )])
    .create_at(CreateTarget::Field("software_title_configuration_id"))
    .save_rules(&[
        SaveRule::DropIf {
            path: "user_interaction/self_service_icon",
            value: Literal::Null,
        },
        SaveRule::DropIf {
            path: "user_interaction/self_service_description",
            value: Literal::Null,
        },
    ]),
    TypeSpec::new(
        "PatchSoftwareTitles",
        "patch_software_title",
        "patch_software_titles",
        "patchsoftwaretitles",
    )
    .arrays(&["versions/version"])
    .fields(&[
        FieldSpec::text("name_id", "0C6"),
        FieldSpec::text("source_id", "1"),
    ]),
    TypeSpec::new("Peripherals", "peripheral", "peripherals", "peripherals").no_create(),
    TypeSpec::new(
        "PeripheralTypes",
        "peripheral_type",
        "peripheral_types",
        "peripheraltypes",
    )
    .no_create(),
    TypeSpec::new("Policies", "policy", "policies", "policies")
        .general_name()
        .save_rules(&[SaveRule::ResetUnless {
            guard: "general/frequency",
            unless: "Once per computer",
            resets: &[
                ("general/retry_attempts", "-1"),
                ("general/retry_event", "none"),
                ("general/notify_on_each_failed_retry", "false"),
            ],
        }]),
    TypeSpec::new("Printers", "printer", "printers", "printers"),
    TypeSpec::new(
        "RemovableMACAddresses",
        "removable_mac_address",
        "removable_mac_addresses",
        "removablemacaddresses",
    ),
    TypeSpec::new("Scripts", "script", "scripts", "scripts"),
    TypeSpec::new("Sites", "site", "sites", "sites"),
    TypeSpec::new(
        "SoftwareUpdateServers",
        "update_software_server",
        "software_update_servers",
        "softwareupdateservers",
    ),
    TypeSpec::new("Users", "user", "users", "users"),
    TypeSpec::new(
        "UserExtensionAttributes",
        "user_extension_attribute",
        "user_extension_attributes",
        "userextensionattributes",
    ),
    TypeSpec::new("UserGroups", "user_group", "user_groups", "usergroups")
        .fields(&[FieldSpec::text("is_smart", "false")])
        .responds_with(&["smart_user_group", "static_user_group"]),
    TypeSpec::new("VPPAccounts", "vpp_account", "vpp_accounts", "vppaccounts")
        .fields(&[FieldSpec::required("service_token")]),
    TypeSpec::new(
        "VPPAssignments",
        "vpp_assignment",
        "vpp_assignments",
        "vppassignments",
    )
    .general_name()
    .fields(&[FieldSpec::text("general/vpp_admin_account_id", "")]),
    TypeSpec::new(
        "VPPInvitations",
        "vpp_invitation",
        "vpp_invitations",
        "vppinvitations",
    )
    .general_name()
    .fields(&[FieldSpec::text("general/vpp_account/id", "")]),
    TypeSpec::new("WebHooks", "webhook", "webhooks", "webhooks").fields(&[
        FieldSpec::text("event", "ComputerAdded"),
        FieldSpec::text("url", "http://example.com"),
    ]),
];
