//! The fixed catalog of repositories, grouped per phase.

use serde::Serialize;
use std::fmt;

/// Base URL for Hugging Face datasets, which are plain git repositories.
pub const HF_DATASETS_URL: &str = "https://huggingface.co/datasets";

pub const YARA_RULES_DIR: &str = "yara_rules";
pub const SIGMA_RULES_DIR: &str = "sigma_rules";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoSpec {
    /// Local directory name.
    pub name: &'static str,
    pub url: &'static str,
}

const fn repo(name: &'static str, url: &'static str) -> RepoSpec {
    RepoSpec { name, url }
}

/// Repositories that share a target directory and a results key.
#[derive(Debug, Clone, Copy)]
pub struct RepoGroup {
    /// Key in the phase results file.
    pub key: &'static str,
    pub label: &'static str,
    /// Directory under the phase directory.
    pub dir: &'static str,
    pub repos: &'static [RepoSpec],
    /// Contains live malware; needs explicit opt-in.
    pub live_malware: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub enum Phase {
    CtfBugBounty,
    ExploitsTools,
    YaraSigma,
    CveDatabase,
    AdvancedThreats,
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        phase.number()
    }
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::CtfBugBounty,
        Phase::ExploitsTools,
        Phase::YaraSigma,
        Phase::CveDatabase,
        Phase::AdvancedThreats,
    ];

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.number() == number)
    }

    pub fn number(self) -> u8 {
        match self {
            Self::CtfBugBounty => 1,
            Self::ExploitsTools => 2,
            Self::YaraSigma => 3,
            Self::CveDatabase => 4,
            Self::AdvancedThreats => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CtfBugBounty => "CTF & Bug Bounty",
            Self::ExploitsTools => "Exploits & Tools",
            Self::YaraSigma => "YARA & Sigma Rules",
            Self::CveDatabase => "CVE Database",
            Self::AdvancedThreats => "Advanced Threats & Black Hat Tactics",
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::CtfBugBounty => "phase1_ctf_bugbounty",
            Self::ExploitsTools => "phase2_exploits_tools",
            Self::YaraSigma => "phase3_yara_sigma",
            Self::CveDatabase => "phase4_cve_database",
            Self::AdvancedThreats => "phase5_advanced_threats",
        }
    }

    pub fn results_file(self) -> String {
        format!("phase{}_results.json", self.number())
    }

    /// Whether this phase clones repositories.
    pub fn needs_git(self) -> bool {
        !self.groups().is_empty()
    }

    /// Repository groups; empty for the API-backed CVE phase.
    pub fn groups(self) -> &'static [RepoGroup] {
        match self {
            Self::CtfBugBounty => PHASE1_GROUPS,
            Self::ExploitsTools => PHASE2_GROUPS,
            Self::YaraSigma => PHASE3_GROUPS,
            Self::CveDatabase => &[],
            Self::AdvancedThreats => PHASE5_GROUPS,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}: {}", self.number(), self.name())
    }
}

const PHASE1_GROUPS: &[RepoGroup] = &[
    RepoGroup {
        key: "ctf_repos",
        label: "CTF repo",
        dir: "ctf_writeups",
        repos: &[
            repo("htb_shundazhang", "https://github.com/ShundaZhang/htb"),
            repo("htb_hackplayers", "https://github.com/hackplayers/hackthebox-writeups"),
            repo("htb_sohailburki1", "https://github.com/sohailburki1/HackTheBox-Writeups"),
            repo("htb_jonbrandy", "https://github.com/jon-brandy/hackthebox"),
            repo("awesome_ctf_cheatsheet", "https://github.com/uppusaikiran/awesome-ctf-cheatsheet"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "bugbounty_repos",
        label: "Bug bounty repo",
        dir: "bugbounty_repos",
        repos: &[
            repo("hackerone_reddelexc", "https://github.com/reddelexc/hackerone-reports"),
            repo("hackerone_buildergk", "https://github.com/buildergk/hackerone-bug-bounty-reports"),
            repo("public_reports_phlmox", "https://github.com/phlmox/public-reports"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "hackerone_dataset",
        label: "HackerOne dataset",
        dir: "hackerone_reports",
        repos: &[repo(
            "hackerone_disclosed_reports",
            "https://huggingface.co/datasets/Hacker0x01/hackerone_disclosed_reports",
        )],
        live_malware: false,
    },
];

const PHASE2_GROUPS: &[RepoGroup] = &[
    RepoGroup {
        key: "exploit_repos",
        label: "Exploit repo",
        dir: "exploits",
        repos: &[
            repo("exploitdb", "https://gitlab.com/exploit-database/exploitdb"),
            repo("payloads_all_the_things", "https://github.com/swisskyrepo/PayloadsAllTheThings"),
            repo("seclists", "https://github.com/danielmiessler/SecLists"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "security_tools",
        label: "Security tool",
        dir: "security_tools",
        repos: &[
            repo("nuclei_templates", "https://github.com/projectdiscovery/nuclei-templates"),
            repo("metasploit_framework", "https://github.com/rapid7/metasploit-framework"),
        ],
        live_malware: false,
    },
];

const PHASE3_GROUPS: &[RepoGroup] = &[
    RepoGroup {
        key: "yara_repos",
        label: "YARA repo",
        dir: YARA_RULES_DIR,
        repos: &[
            repo("yara_rules_official", "https://github.com/Yara-Rules/rules"),
            repo("neo23x0_signature_base", "https://github.com/Neo23x0/signature-base"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "sigma_repos",
        label: "Sigma repo",
        dir: SIGMA_RULES_DIR,
        repos: &[
            repo("sigmahq_sigma", "https://github.com/SigmaHQ/sigma"),
            repo("pysigma", "https://github.com/SigmaHQ/pySigma"),
        ],
        live_malware: false,
    },
];

const PHASE5_GROUPS: &[RepoGroup] = &[
    RepoGroup {
        key: "malware_repos",
        label: "Malware repo",
        dir: "malware_analysis",
        repos: &[
            repo("malware_analysis", "https://github.com/rshipp/awesome-malware-analysis"),
            repo("malware_traffic_analysis", "https://github.com/pan-unit42/iocs"),
            repo("malware_bazaar", "https://github.com/abuse-ch/MalwareBazaar"),
            repo("ransomware_overview", "https://github.com/arieljaufman/Ransomware-Guide"),
            repo("ransomware_simulator", "https://github.com/NextronSystems/ransomware-simulator"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "malware_repos",
        label: "Live malware repo",
        dir: "malware_analysis",
        repos: &[
            repo("theZoo", "https://github.com/ytisf/theZoo"),
            repo("vx_underground", "https://github.com/vxunderground/MalwareSourceCode"),
        ],
        live_malware: true,
    },
    RepoGroup {
        key: "phishing_repos",
        label: "Phishing repo",
        dir: "phishing_social_eng",
        repos: &[
            repo("phishing_database", "https://github.com/mitchellkrogza/Phishing.Database"),
            repo("social_engineering_toolkit", "https://github.com/trustedsec/social-engineer-toolkit"),
            repo("gophish", "https://github.com/gophish/gophish"),
            repo("evilginx2", "https://github.com/kgretzky/evilginx2"),
            repo("modlishka", "https://github.com/drk1wi/Modlishka"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "mobile_repos",
        label: "Mobile repo",
        dir: "mobile_security",
        repos: &[
            repo("mobsf", "https://github.com/MobSF/Mobile-Security-Framework-MobSF"),
            repo("androguard", "https://github.com/androguard/androguard"),
            repo("android_vulnerabilities", "https://github.com/SecWiki/android-security-awesome"),
            repo("apkleaks", "https://github.com/dwisiswant0/apkleaks"),
            repo("frida", "https://github.com/frida/frida"),
            repo("ios_security", "https://github.com/Siguza/ios-resources"),
            repo("objection", "https://github.com/sensepost/objection"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "crypto_repos",
        label: "Crypto repo",
        dir: "crypto_attacks",
        repos: &[
            repo("cryptojacking_samples", "https://github.com/r00t-3xp10it/cryptominer"),
            repo("blockchain_attacks", "https://github.com/Mechanism-Labs/MetaMask"),
            repo("smart_contract_exploits", "https://github.com/SunWeb3Sec/DeFiHackLabs"),
            repo("not_so_smart_contracts", "https://github.com/crytic/not-so-smart-contracts"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "cloud_repos",
        label: "Cloud repo",
        dir: "cloud_security",
        repos: &[
            repo("pacu", "https://github.com/RhinoSecurityLabs/pacu"),
            repo("cloudgoat", "https://github.com/RhinoSecurityLabs/cloudgoat"),
            repo("prowler", "https://github.com/prowler-cloud/prowler"),
            repo("azure_redteam", "https://github.com/RhinoSecurityLabs/AzureGoat"),
            repo("microburst", "https://github.com/NetSPI/MicroBurst"),
            repo("gcpbucketbrute", "https://github.com/RhinoSecurityLabs/GCPBucketBrute"),
            repo("cloudsploit", "https://github.com/aquasecurity/cloudsploit"),
            repo("scoutsuite", "https://github.com/nccgroup/ScoutSuite"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "binary_repos",
        label: "Binary exploitation repo",
        dir: "binary_exploitation",
        repos: &[
            repo("rop_emporium", "https://github.com/ropemporium/ropemporium.github.io"),
            repo("pwn_college", "https://github.com/pwncollege/pwncollege.github.io"),
            repo("how2heap", "https://github.com/shellphish/how2heap"),
            repo("ret2libc", "https://github.com/Naetw/CTF-pwn-tips"),
            repo("reversing_challenges", "https://github.com/rpisec/MBE"),
            repo("crackmes", "https://github.com/RPISEC/Malware"),
            repo("flare_on", "https://github.com/fareedfauzi/Flare-On-Challenges"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "apt_repos",
        label: "APT repo",
        dir: "apt_intelligence",
        repos: &[
            repo("apt_notes", "https://github.com/aptnotes/data"),
            repo("mitre_attack", "https://github.com/mitre-attack/attack-stix-data"),
            repo("threat_intelligence", "https://github.com/hslatman/awesome-threat-intelligence"),
            repo("cyber_threat_intel", "https://github.com/curated-intel/Ukraine-Cyber-Operations"),
        ],
        live_malware: false,
    },
    RepoGroup {
        key: "hf_datasets",
        label: "HF dataset",
        dir: "huggingface_datasets",
        repos: &[
            repo("malware_api_calls", "https://huggingface.co/datasets/santhisenan/malware_api_call_sequences"),
            repo("phishing_emails", "https://huggingface.co/datasets/ealvaradob/phishing-dataset"),
            repo("android_malware", "https://huggingface.co/datasets/EMCS-JKUAT/android-malware"),
        ],
        live_malware: false,
    },
];
